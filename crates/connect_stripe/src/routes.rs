// --- File: crates/connect_stripe/src/routes.rs ---

use axum::{
    extract::{Query, State},
    routing::{delete, get, patch, post},
    Router,
};
use connect_common::PaginationQuery;
use std::sync::Arc;

use crate::fields::PersonRole;
use crate::forms::FormSubmission;
use crate::handlers::{self, ConnectState, PersonIdQuery, StripeIdQuery};
use crate::pages::{self, PageQuery};
use crate::session::DashboardAccount;

type ConnectRouter = Router<Arc<ConnectState>>;

/// Owner and director families share every handler; only the role differs.
const PERSON_FAMILIES: [PersonRole; 2] = [PersonRole::BeneficialOwner, PersonRole::Director];

/// Creates a router containing all Connect routes: the JSON API, the HTML
/// pages of both dashboards and the webhook.
pub fn routes(state: Arc<ConnectState>) -> Router {
    Router::new()
        .nest("/api/user/connect", user_api_routes())
        .nest("/api/administrator/connect", admin_api_routes())
        .nest("/account/connect", user_page_routes())
        .nest("/administrator/connect", admin_page_routes())
        .route(
            "/webhooks/connect/index-connect-data",
            post(handlers::connect_webhook_handler),
        )
        .with_state(state)
}

fn user_api_routes() -> ConnectRouter {
    let router = Router::new()
        .route("/stripe-accounts", get(handlers::list_stripe_accounts_handler))
        .route(
            "/stripe-accounts-count",
            get(handlers::count_stripe_accounts_handler),
        )
        .route("/stripe-account", get(handlers::get_stripe_account_handler))
        .route(
            "/create-stripe-account",
            post(handlers::create_stripe_account_handler),
        )
        .route(
            "/update-company-registration",
            patch(handlers::update_company_registration_handler),
        )
        .route(
            "/update-individual-registration",
            patch(handlers::update_individual_registration_handler),
        )
        .route(
            "/update-payment-details",
            patch(handlers::update_payment_details_handler),
        )
        .route(
            "/set-stripe-account-submitted",
            patch(handlers::submit_stripe_account_handler),
        )
        .route(
            "/delete-stripe-account",
            delete(handlers::delete_stripe_account_handler),
        )
        .route(
            "/company-representative",
            get(handlers::get_company_representative_handler),
        )
        .route(
            "/create-company-representative",
            post(handlers::create_company_representative_handler),
        )
        .route(
            "/update-company-representative",
            patch(handlers::update_company_representative_handler),
        )
        .route("/payouts", get(handlers::list_payouts_handler))
        .route("/payouts-count", get(handlers::count_payouts_handler))
        .route("/payout", get(handlers::get_payout_handler))
        .route("/country-spec", get(handlers::get_country_spec_handler))
        .route("/country-specs", get(handlers::list_country_specs_handler));

    PERSON_FAMILIES
        .into_iter()
        .fold(router, |router, role| router.merge(person_api_routes(role)))
}

/// `{plural}`, `{plural}-count`, `{slug}`, `create-{slug}`, `update-{slug}`,
/// `delete-{slug}` and `set-{plural}-submitted` for one role.
fn person_api_routes(role: PersonRole) -> ConnectRouter {
    let slug = role.slug();
    let plural = role.plural_slug();
    Router::new()
        .route(
            &format!("/{}", plural),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<StripeIdQuery>,
                      Query(page): Query<PaginationQuery>| {
                    handlers::list_persons_handler(role, state, caller, query, page)
                },
            ),
        )
        .route(
            &format!("/{}-count", plural),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<StripeIdQuery>| {
                    handlers::count_persons_handler(role, state, caller, query)
                },
            ),
        )
        .route(
            &format!("/{}", slug),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PersonIdQuery>| {
                    handlers::get_person_handler(role, state, caller, query)
                },
            ),
        )
        .route(
            &format!("/create-{}", slug),
            post(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<StripeIdQuery>,
                      submission: FormSubmission| {
                    handlers::create_person_handler(role, state, caller, query, submission)
                },
            ),
        )
        .route(
            &format!("/update-{}", slug),
            patch(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PersonIdQuery>,
                      submission: FormSubmission| {
                    handlers::update_person_handler(role, state, caller, query, submission)
                },
            ),
        )
        .route(
            &format!("/delete-{}", slug),
            delete(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PersonIdQuery>| {
                    handlers::delete_person_handler(role, state, caller, query)
                },
            ),
        )
        .route(
            &format!("/set-{}-submitted", plural),
            patch(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<StripeIdQuery>| {
                    handlers::submit_persons_handler(role, state, caller, query)
                },
            ),
        )
}

fn admin_api_routes() -> ConnectRouter {
    Router::new()
        .route(
            "/stripe-accounts",
            get(handlers::admin_list_stripe_accounts_handler),
        )
        .route(
            "/stripe-accounts-count",
            get(handlers::admin_count_stripe_accounts_handler),
        )
        .route(
            "/stripe-account",
            get(handlers::admin_get_stripe_account_handler),
        )
        .route("/payouts", get(handlers::admin_list_payouts_handler))
        .route("/payout", get(handlers::admin_get_payout_handler))
        .route(
            "/set-stripe-account-rejected",
            patch(handlers::admin_reject_stripe_account_handler),
        )
        .route(
            "/delete-stripe-account",
            delete(handlers::admin_delete_stripe_account_handler),
        )
}

fn user_page_routes() -> ConnectRouter {
    let router = Router::new()
        .route("/", get(pages::stripe_accounts_page))
        .route("/stripe-accounts", get(pages::stripe_accounts_page))
        .route("/stripe-account", get(pages::stripe_account_page))
        .route(
            "/create-stripe-account",
            get(pages::create_stripe_account_form_page).post(pages::create_stripe_account_page),
        )
        .route(
            "/edit-company-registration",
            get(pages::edit_company_registration_page)
                .post(pages::update_company_registration_page),
        )
        .route(
            "/edit-individual-registration",
            get(pages::edit_individual_registration_page)
                .post(pages::update_individual_registration_page),
        )
        .route(
            "/edit-payment-details",
            get(pages::edit_payment_details_page).post(pages::update_payment_details_page),
        )
        .route(
            "/edit-company-representative",
            get(pages::edit_company_representative_page)
                .post(pages::update_company_representative_page),
        )
        .route(
            "/submit-stripe-account",
            get(pages::submit_stripe_account_form_page).post(pages::submit_stripe_account_page),
        )
        .route(
            "/delete-stripe-account",
            get(pages::delete_stripe_account_form_page).post(pages::delete_stripe_account_page),
        )
        .route("/payouts", get(pages::payouts_page))
        .route("/payout", get(pages::payout_page));

    PERSON_FAMILIES
        .into_iter()
        .fold(router, |router, role| router.merge(person_page_routes(role)))
}

/// HTML forms only GET and POST, so edits and deletes are POSTs here.
fn person_page_routes(role: PersonRole) -> ConnectRouter {
    let slug = role.slug();
    let plural = role.plural_slug();
    Router::new()
        .route(
            &format!("/{}", plural),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>,
                      Query(page): Query<PaginationQuery>| {
                    pages::persons_page(role, state, caller, query, page)
                },
            ),
        )
        .route(
            &format!("/{}", slug),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::person_page(role, state, caller, query)
                },
            ),
        )
        .route(
            &format!("/create-{}", slug),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::create_person_form_page(role, state, caller, query)
                },
            )
            .post(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>,
                      submission: FormSubmission| {
                    pages::create_person_page(role, state, caller, query, submission)
                },
            ),
        )
        .route(
            &format!("/edit-{}", slug),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::edit_person_form_page(role, state, caller, query)
                },
            )
            .post(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>,
                      submission: FormSubmission| {
                    pages::update_person_page(role, state, caller, query, submission)
                },
            ),
        )
        .route(
            &format!("/delete-{}", slug),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::delete_person_form_page(role, state, caller, query)
                },
            )
            .post(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::delete_person_page(role, state, caller, query)
                },
            ),
        )
        .route(
            &format!("/submit-{}", plural),
            get(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::submit_persons_form_page(role, state, caller, query)
                },
            )
            .post(
                move |State(state): State<Arc<ConnectState>>,
                      caller: DashboardAccount,
                      Query(query): Query<PageQuery>| {
                    pages::submit_persons_page(role, state, caller, query)
                },
            ),
        )
}

fn admin_page_routes() -> ConnectRouter {
    Router::new()
        .route("/", get(pages::admin_stripe_accounts_page))
        .route("/stripe-accounts", get(pages::admin_stripe_accounts_page))
        .route("/stripe-account", get(pages::admin_stripe_account_page))
        .route(
            "/reject-stripe-account",
            get(pages::admin_reject_stripe_account_form_page)
                .post(pages::admin_reject_stripe_account_page),
        )
        .route(
            "/delete-stripe-account",
            get(pages::admin_delete_stripe_account_form_page)
                .post(pages::admin_delete_stripe_account_page),
        )
        .route("/payouts", get(pages::admin_payouts_page))
        .route("/payout", get(pages::admin_payout_page))
}
