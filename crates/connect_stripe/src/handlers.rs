// --- File: crates/connect_stripe/src/handlers.rs ---
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use connect_common::{logging::log_error, PaginationQuery};
use connect_config::AppConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::ConnectApi;
use crate::countries::CountryTable;
use crate::error::ConnectError;
use crate::fields::PersonRole;
use crate::forms::FormSubmission;
use crate::index::ConnectIndex;
use crate::logic;
use crate::session::DashboardAccount;
use crate::webhook::{process_connect_event, verify_stripe_signature, ConnectEvent};

#[cfg(feature = "openapi")]
use utoipa::IntoParams;

// --- State for Connect Handlers ---
#[derive(Clone)]
pub struct ConnectState {
    pub config: Arc<AppConfig>,
    pub api: Arc<dyn ConnectApi>,
    pub index: Arc<dyn ConnectIndex>,
    pub countries: Arc<CountryTable>,
}

impl ConnectState {
    pub fn page_size(&self) -> usize {
        self.config.dashboard.page_size.max(1)
    }

    pub fn uses_stripe_js(&self) -> bool {
        self.config
            .stripe
            .as_ref()
            .is_some_and(|stripe| stripe.uses_stripe_js())
    }

    pub fn publishable_key(&self) -> Option<&str> {
        self.config
            .stripe
            .as_ref()
            .and_then(|stripe| stripe.publishable_key.as_deref())
    }
}

// --- Query parameters ---

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
pub struct StripeIdQuery {
    pub stripeid: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
pub struct PersonIdQuery {
    pub personid: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
pub struct PayoutIdQuery {
    pub payoutid: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
pub struct CountryIdQuery {
    pub countryid: Option<String>,
}

/// JSON body or error for one API operation.
fn respond<T: Serialize>(operation: &str, result: Result<T, ConnectError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            log_error(&err, &format!("[Connect API] {}", operation));
            err.into_response()
        }
    }
}

// --- Stripe accounts ---

pub async fn list_stripe_accounts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::list_stripe_accounts(&state, &caller, &page).await;
    respond("stripe-accounts", result.map(|page| page.items))
}

pub async fn count_stripe_accounts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
) -> Response {
    Json(logic::count_stripe_accounts(&state, &caller).await).into_response()
}

pub async fn get_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result =
        crate::guards::load_owned_account(&state, &caller, query.stripeid.as_deref()).await;
    respond("stripe-account", result)
}

pub async fn create_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    submission: FormSubmission,
) -> Response {
    let result = logic::create_stripe_account(&state, &caller, &submission).await;
    respond("create-stripe-account", result)
}

pub async fn update_company_registration_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    submission: FormSubmission,
) -> Response {
    let result = logic::update_company_registration(
        &state,
        &caller,
        query.stripeid.as_deref(),
        submission,
    )
    .await;
    respond("update-company-registration", result)
}

pub async fn update_individual_registration_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    submission: FormSubmission,
) -> Response {
    let result = logic::update_individual_registration(
        &state,
        &caller,
        query.stripeid.as_deref(),
        submission,
    )
    .await;
    respond("update-individual-registration", result)
}

pub async fn update_payment_details_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    submission: FormSubmission,
) -> Response {
    let result =
        logic::update_payment_details(&state, &caller, query.stripeid.as_deref(), submission)
            .await;
    respond("update-payment-details", result)
}

pub async fn submit_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result = logic::submit_stripe_account(&state, &caller, query.stripeid.as_deref()).await;
    respond("submit-stripe-account", result)
}

pub async fn delete_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result = logic::delete_stripe_account(&state, &caller, query.stripeid.as_deref()).await;
    respond("delete-stripe-account", result)
}

// --- Company representative ---

pub async fn get_company_representative_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result =
        logic::get_company_representative(&state, &caller, query.stripeid.as_deref()).await;
    match result {
        Ok((_, Some(person))) => Json(person).into_response(),
        Ok((_, None)) => ConnectError::InvalidCompanyRepresentative.into_response(),
        Err(err) => respond::<()>("company-representative", Err(err)),
    }
}

pub async fn create_company_representative_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    submission: FormSubmission,
) -> Response {
    let result = logic::create_company_representative(
        &state,
        &caller,
        query.stripeid.as_deref(),
        submission,
    )
    .await;
    respond("create-company-representative", result)
}

pub async fn update_company_representative_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    submission: FormSubmission,
) -> Response {
    let result = logic::update_company_representative(
        &state,
        &caller,
        query.stripeid.as_deref(),
        submission,
    )
    .await;
    respond("update-company-representative", result)
}

// --- Beneficial owners and company directors ---
// One handler per operation, parameterised by role; see routes::person_api_routes.

pub async fn list_persons_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: StripeIdQuery,
    page: PaginationQuery,
) -> Response {
    let result = logic::list_persons(&state, &caller, query.stripeid.as_deref(), role, &page).await;
    respond(role.plural_slug(), result.map(|(_, page)| page.items))
}

pub async fn count_persons_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: StripeIdQuery,
) -> Response {
    let result = logic::count_persons(&state, &caller, query.stripeid.as_deref(), role).await;
    respond(role.plural_slug(), result)
}

pub async fn get_person_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PersonIdQuery,
) -> Response {
    let result = logic::get_person(&state, &caller, query.personid.as_deref(), role).await;
    respond(role.slug(), result.map(|(_, person)| person))
}

pub async fn create_person_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: StripeIdQuery,
    submission: FormSubmission,
) -> Response {
    let result =
        logic::create_person(&state, &caller, query.stripeid.as_deref(), role, submission).await;
    respond(role.slug(), result)
}

pub async fn update_person_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PersonIdQuery,
    submission: FormSubmission,
) -> Response {
    let result =
        logic::update_person(&state, &caller, query.personid.as_deref(), role, submission).await;
    respond(role.slug(), result)
}

pub async fn delete_person_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PersonIdQuery,
) -> Response {
    let result = logic::delete_person(&state, &caller, query.personid.as_deref(), role).await;
    respond(role.slug(), result)
}

pub async fn submit_persons_handler(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: StripeIdQuery,
) -> Response {
    let result = logic::submit_persons(&state, &caller, query.stripeid.as_deref(), role).await;
    respond(role.plural_slug(), result)
}

// --- Payouts and countries ---

pub async fn list_payouts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::list_payouts(&state, &caller, query.stripeid.as_deref(), &page).await;
    respond("payouts", result.map(|(_, page)| page.items))
}

pub async fn count_payouts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result = logic::count_payouts(&state, &caller, query.stripeid.as_deref()).await;
    respond("payouts-count", result)
}

pub async fn get_payout_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PayoutIdQuery>,
) -> Response {
    let result = logic::get_payout(&state, &caller, query.payoutid.as_deref()).await;
    respond("payout", result)
}

pub async fn get_country_spec_handler(
    State(state): State<Arc<ConnectState>>,
    _caller: DashboardAccount,
    Query(query): Query<CountryIdQuery>,
) -> Response {
    let result = logic::country_spec(&state, query.countryid.as_deref()).await;
    respond("country-spec", result)
}

pub async fn list_country_specs_handler(
    State(state): State<Arc<ConnectState>>,
    _caller: DashboardAccount,
) -> Response {
    Json(logic::supported_countries(&state)).into_response()
}

// --- Administrator ---

pub async fn admin_list_stripe_accounts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::admin_list_stripe_accounts(&state, &caller, &page).await;
    respond("administrator stripe-accounts", result.map(|page| page.items))
}

pub async fn admin_count_stripe_accounts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
) -> Response {
    let result = logic::admin_count_stripe_accounts(&state, &caller).await;
    respond("administrator stripe-accounts-count", result)
}

pub async fn admin_get_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result = logic::admin_get_stripe_account(&state, &caller, query.stripeid.as_deref()).await;
    respond("administrator stripe-account", result)
}

pub async fn admin_list_payouts_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result =
        logic::admin_list_payouts(&state, &caller, query.stripeid.as_deref(), &page).await;
    respond("administrator payouts", result.map(|(_, page)| page.items))
}

pub async fn admin_get_payout_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PayoutIdQuery>,
) -> Response {
    let result = logic::admin_get_payout(&state, &caller, query.payoutid.as_deref()).await;
    respond("administrator payout", result)
}

pub async fn admin_reject_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
    submission: FormSubmission,
) -> Response {
    let result = logic::admin_reject_stripe_account(
        &state,
        &caller,
        query.stripeid.as_deref(),
        submission.get("reason"),
    )
    .await;
    respond("set-stripe-account-rejected", result)
}

pub async fn admin_delete_stripe_account_handler(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<StripeIdQuery>,
) -> Response {
    let result =
        logic::admin_delete_stripe_account(&state, &caller, query.stripeid.as_deref()).await;
    respond("administrator delete-stripe-account", result)
}

// --- Webhook ---

/// Receives Connect events from Stripe and keeps the person and payout index
/// current. The raw body is needed for signature verification.
pub async fn connect_webhook_handler(
    State(state): State<Arc<ConnectState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(stripe_config) = state.config.stripe.as_ref() else {
        warn!("[Connect Webhook] Stripe configuration not loaded");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let Some(secret) = stripe_config.webhook_secret.as_deref().filter(|s| !s.is_empty()) else {
        warn!("[Connect Webhook] Webhook secret not configured");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let sig_header = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok());
    if let Err(e) = verify_stripe_signature(
        body.as_bytes(),
        sig_header,
        secret,
        stripe_config.webhook_tolerance_secs,
    ) {
        warn!("[Connect Webhook] {}", e);
        return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
    }

    let event: ConnectEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("[Connect Webhook] Could not parse event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid event payload").into_response();
        }
    };

    info!("[Connect Webhook] Received {} ({})", event.event_type, event.id);
    match process_connect_event(&event, state.index.as_ref()).await {
        Ok(()) => Json(serde_json::json!({ "received": true })).into_response(),
        Err(e) => {
            log_error(&e, "[Connect Webhook] Processing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
