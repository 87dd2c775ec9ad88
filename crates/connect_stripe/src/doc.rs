// --- File: crates/connect_stripe/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::fields::PersonRole;
use crate::handlers::{CountryIdQuery, PayoutIdQuery, PersonIdQuery, StripeIdQuery};
use crate::models::{
    Address, BusinessType, Company, CountrySpec, Dob, ExternalAccount, Payout, Person,
    Relationship, Requirements, StripeAccount, SupportedCountry, Verification,
    VerificationDocument,
};
use crate::webhook::{ConnectEvent, ConnectEventData};

// Paths are relative to the backend root. Beneficial owners and company
// directors share their shape; the director family is documented through the
// owner paths.

#[utoipa::path(
    get,
    path = "/api/user/connect/stripe-accounts",
    params(
        ("offset" = Option<usize>, Query, description = "Items to skip"),
        ("limit" = Option<usize>, Query, description = "Items per page, PAGE_SIZE by default"),
        ("all" = Option<bool>, Query, description = "Return every item")
    ),
    responses(
        (status = 200, description = "Stripe accounts of the signed-in account, newest first", body = [StripeAccount]),
        (status = 401, description = "No dashboard account on the request")
    ),
    tag = "Connect"
)]
fn doc_list_stripe_accounts_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/stripe-accounts-count",
    responses((status = 200, description = "Number of Stripe accounts", body = usize)),
    tag = "Connect"
)]
fn doc_count_stripe_accounts_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/stripe-account",
    params(StripeIdQuery),
    responses(
        (status = 200, description = "The Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-stripeid"),
        (status = 403, description = "invalid-account")
    ),
    tag = "Connect"
)]
fn doc_get_stripe_account_handler() {}

#[utoipa::path(
    post,
    path = "/api/user/connect/create-stripe-account",
    request_body(content = Object, example = json!({ "type": "company", "country": "DE" })),
    responses(
        (status = 200, description = "Created Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-type or invalid-country")
    ),
    tag = "Connect"
)]
fn doc_create_stripe_account_handler() {}

#[utoipa::path(
    patch,
    path = "/api/user/connect/update-company-registration",
    params(StripeIdQuery),
    request_body(content = Object, example = json!({
        "company_name": "Beispiel GmbH",
        "company_tax_id": "DE123456789",
        "company_address_line1": "Hauptstraße 1",
        "company_address_city": "Berlin",
        "company_address_postal_code": "10115"
    })),
    responses(
        (status = 200, description = "Updated Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-<field>, invalid-token or invalid-stripe-account")
    ),
    tag = "Connect"
)]
fn doc_update_company_registration_handler() {}

#[utoipa::path(
    patch,
    path = "/api/user/connect/update-individual-registration",
    params(StripeIdQuery),
    request_body(content = Object, example = json!({
        "individual_first_name": "Erika",
        "individual_last_name": "Mustermann",
        "individual_dob_day": "12",
        "individual_dob_month": "8",
        "individual_dob_year": "1964"
    })),
    responses(
        (status = 200, description = "Updated Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-<field>, invalid-token or invalid-stripe-account")
    ),
    tag = "Connect"
)]
fn doc_update_individual_registration_handler() {}

#[utoipa::path(
    patch,
    path = "/api/user/connect/update-payment-details",
    params(StripeIdQuery),
    request_body(content = Object, example = json!({
        "currency": "eur",
        "country": "DE",
        "account_holder_name": "Beispiel GmbH",
        "account_holder_type": "company",
        "iban": "DE89370400440532013000"
    })),
    responses(
        (status = 200, description = "Updated Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-<field>")
    ),
    tag = "Connect"
)]
fn doc_update_payment_details_handler() {}

#[utoipa::path(
    patch,
    path = "/api/user/connect/set-stripe-account-submitted",
    params(StripeIdQuery),
    responses(
        (status = 200, description = "Submitted Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-payment-details, invalid-company-representative, invalid-beneficial-owners, invalid-company-directors or invalid-registration")
    ),
    tag = "Connect"
)]
fn doc_submit_stripe_account_handler() {}

#[utoipa::path(
    delete,
    path = "/api/user/connect/delete-stripe-account",
    params(StripeIdQuery),
    responses((status = 200, description = "The deleted Stripe account", body = StripeAccount)),
    tag = "Connect"
)]
fn doc_delete_stripe_account_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/company-representative",
    params(StripeIdQuery),
    responses(
        (status = 200, description = "The company representative", body = Person),
        (status = 400, description = "invalid-company-representative")
    ),
    tag = "Connect Persons"
)]
fn doc_get_company_representative_handler() {}

#[utoipa::path(
    post,
    path = "/api/user/connect/create-company-representative",
    params(StripeIdQuery),
    request_body(content = Object, example = json!({ "first_name": "Erika", "last_name": "Mustermann", "relationship_title": "CEO" })),
    responses((status = 200, description = "Created representative", body = Person)),
    tag = "Connect Persons"
)]
fn doc_create_company_representative_handler() {}

#[utoipa::path(
    patch,
    path = "/api/user/connect/update-company-representative",
    params(StripeIdQuery),
    request_body(content = Object),
    responses((status = 200, description = "Updated representative", body = Person)),
    tag = "Connect Persons"
)]
fn doc_update_company_representative_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/beneficial-owners",
    params(StripeIdQuery),
    responses((status = 200, description = "Beneficial owners; /company-directors lists directors", body = [Person])),
    tag = "Connect Persons"
)]
fn doc_list_persons_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/beneficial-owner",
    params(PersonIdQuery),
    responses(
        (status = 200, description = "One beneficial owner; /company-director for directors", body = Person),
        (status = 400, description = "invalid-personid")
    ),
    tag = "Connect Persons"
)]
fn doc_get_person_handler() {}

#[utoipa::path(
    post,
    path = "/api/user/connect/create-beneficial-owner",
    params(StripeIdQuery),
    request_body(content = Object, example = json!({ "first_name": "Max", "last_name": "Mustermann", "relationship_percent_ownership": "30" })),
    responses(
        (status = 200, description = "Created owner; /create-company-director for directors", body = Person),
        (status = 400, description = "invalid-<field> or invalid-stripe-account")
    ),
    tag = "Connect Persons"
)]
fn doc_create_person_handler() {}

#[utoipa::path(
    patch,
    path = "/api/user/connect/set-beneficial-owners-submitted",
    params(StripeIdQuery),
    responses((status = 200, description = "Owners marked complete; zero owners is allowed", body = StripeAccount)),
    tag = "Connect Persons"
)]
fn doc_submit_persons_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/payouts",
    params(StripeIdQuery),
    responses((status = 200, description = "Payouts of the account", body = [Payout])),
    tag = "Connect Payouts"
)]
fn doc_list_payouts_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/payout",
    params(PayoutIdQuery),
    responses(
        (status = 200, description = "One payout", body = Payout),
        (status = 400, description = "invalid-payoutid")
    ),
    tag = "Connect Payouts"
)]
fn doc_get_payout_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/country-spec",
    params(CountryIdQuery),
    responses(
        (status = 200, description = "Stripe country spec", body = CountrySpec),
        (status = 400, description = "invalid-countryid")
    ),
    tag = "Connect Countries"
)]
fn doc_get_country_spec_handler() {}

#[utoipa::path(
    get,
    path = "/api/user/connect/country-specs",
    responses((status = 200, description = "Supported countries", body = [SupportedCountry])),
    tag = "Connect Countries"
)]
fn doc_list_country_specs_handler() {}

#[utoipa::path(
    get,
    path = "/api/administrator/connect/stripe-accounts",
    responses(
        (status = 200, description = "All Stripe accounts", body = [StripeAccount]),
        (status = 403, description = "invalid-account")
    ),
    tag = "Connect Admin"
)]
fn doc_admin_list_stripe_accounts_handler() {}

#[utoipa::path(
    patch,
    path = "/api/administrator/connect/set-stripe-account-rejected",
    params(StripeIdQuery),
    request_body(content = Object, example = json!({ "reason": "fraud" })),
    responses(
        (status = 200, description = "Rejected Stripe account", body = StripeAccount),
        (status = 400, description = "invalid-reason")
    ),
    tag = "Connect Admin"
)]
fn doc_admin_reject_stripe_account_handler() {}

#[utoipa::path(
    post,
    path = "/webhooks/connect/index-connect-data",
    request_body = ConnectEvent,
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 500, description = "Webhook secret not configured")
    ),
    tag = "Connect Webhooks"
)]
fn doc_connect_webhook_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_list_stripe_accounts_handler,
        doc_count_stripe_accounts_handler,
        doc_get_stripe_account_handler,
        doc_create_stripe_account_handler,
        doc_update_company_registration_handler,
        doc_update_individual_registration_handler,
        doc_update_payment_details_handler,
        doc_submit_stripe_account_handler,
        doc_delete_stripe_account_handler,
        doc_get_company_representative_handler,
        doc_create_company_representative_handler,
        doc_update_company_representative_handler,
        doc_list_persons_handler,
        doc_get_person_handler,
        doc_create_person_handler,
        doc_submit_persons_handler,
        doc_list_payouts_handler,
        doc_get_payout_handler,
        doc_get_country_spec_handler,
        doc_list_country_specs_handler,
        doc_admin_list_stripe_accounts_handler,
        doc_admin_reject_stripe_account_handler,
        doc_connect_webhook_handler
    ),
    components(
        schemas(
            StripeAccount, Company, Person, Relationship, Requirements, Address, Dob,
            Verification, VerificationDocument, ExternalAccount, BusinessType,
            Payout, CountrySpec, SupportedCountry,
            PersonRole, ConnectEvent, ConnectEventData
        )
    ),
    tags(
        (name = "Connect", description = "Stripe Connect account onboarding"),
        (name = "Connect Persons", description = "Company representative, beneficial owners and company directors"),
        (name = "Connect Payouts", description = "Payouts of connected accounts"),
        (name = "Connect Countries", description = "Supported countries"),
        (name = "Connect Admin", description = "Administrator operations"),
        (name = "Connect Webhooks", description = "Stripe server-to-server events")
    )
)]
pub struct ConnectApiDoc;
