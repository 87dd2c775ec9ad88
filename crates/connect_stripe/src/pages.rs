// --- File: crates/connect_stripe/src/pages.rs ---
//! HTML pages for the account and administrator dashboards.
//!
//! Every page runs the same `logic` operation as its JSON counterpart. A GET
//! that fails shows only the error. A POST that fails shows the form again
//! with the error and the values already entered; one that succeeds
//! redirects to `return-url` or the natural next page.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::Response,
};
use chrono::DateTime;
use connect_common::{logging::log_error, PaginationQuery};
use serde::Deserialize;
use std::{collections::BTreeMap, sync::Arc};

use crate::countries::EntityFields;
use crate::error::ConnectError;
use crate::fields::{EntityKind, PersonRole};
use crate::forms::FormSubmission;
use crate::guards::{
    country_of, entity_of, load_account_as_administrator, load_owned_account, require_company,
    require_individual, require_not_submitted, require_role_open,
};
use crate::handlers::ConnectState;
use crate::logic::{self, REJECT_REASONS};
use crate::models::{Address, Payout, Person, StripeAccount};
use crate::session::DashboardAccount;
use crate::view::{
    entity_fields, error_page, render, success_redirect, DetailView, FieldView, FormView,
    LinkView, ListView, MessageView, NavbarView, RowView, ADMIN_BASE, USER_BASE,
};

/// Query parameters any page may carry.
#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    pub stripeid: Option<String>,
    pub personid: Option<String>,
    pub payoutid: Option<String>,
    /// `success` after a redirect from a saved form.
    pub message: Option<String>,
    #[serde(rename = "return-url")]
    pub return_url: Option<String>,
}

impl PageQuery {
    fn banner(&self) -> Option<MessageView> {
        MessageView::from_query(self.message.as_deref())
    }
}

// --- Helpers ---

fn show<T: Template>(operation: &str, result: Result<T, ConnectError>) -> Response {
    match result {
        Ok(view) => render(&view),
        Err(err) => {
            log_error(&err, &format!("[Connect Pages] {}", operation));
            error_page(&err)
        }
    }
}

/// The form again, carrying the error and the submitted values. If the form
/// itself can no longer be built, that error is shown instead.
fn form_failed(
    operation: &str,
    err: ConnectError,
    form: Result<FormView, ConnectError>,
    values: &BTreeMap<String, String>,
) -> Response {
    log_error(&err, &format!("[Connect Pages] {}", operation));
    match form {
        Ok(form) => render(&form.with_error(&err).with_values(values)),
        Err(load_err) => error_page(&load_err),
    }
}

fn user_url(path: &str, stripe_id: &str) -> String {
    format!("{}/{}?stripeid={}", USER_BASE, path, stripe_id)
}

fn admin_url(path: &str, stripe_id: &str) -> String {
    format!("{}/{}?stripeid={}", ADMIN_BASE, path, stripe_id)
}

fn person_url(role: PersonRole, action: &str, person_id: &str) -> String {
    format!("{}/{}{}?personid={}", USER_BASE, action, role.slug(), person_id)
}

fn navbar(state: &ConnectState, account: &StripeAccount) -> Option<NavbarView> {
    country_of(state, account)
        .ok()
        .map(|country| NavbarView::for_account(account, country))
}

fn entity_form(entity: &EntityFields, title: impl Into<String>, action: String) -> FormView {
    let mut form = FormView::new(title, action);
    form.fields = entity_fields(entity);
    form
}

fn confirm_form(title: impl Into<String>, action: String, intro: String, label: &str) -> FormView {
    let mut form = FormView::new(title, action);
    form.intro = Some(intro);
    form.submit_label = label.to_string();
    form
}

/// Switches the form to Stripe.js tokenization when it is enabled.
fn tokenized(
    mut form: FormView,
    state: &ConnectState,
    token_kind: &str,
    business_type: Option<&str>,
) -> FormView {
    if state.uses_stripe_js() {
        form.token_kind = Some(token_kind.to_string());
        form.business_type = business_type.map(str::to_string);
        form.publishable_key = state.publishable_key().map(str::to_string);
    }
    form
}

fn date(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn amount(payout: &Payout) -> String {
    let sign = if payout.amount < 0 { "-" } else { "" };
    let cents = payout.amount.unsigned_abs();
    format!(
        "{}{}.{:02} {}",
        sign,
        cents / 100,
        cents % 100,
        payout.currency.to_uppercase()
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn account_status(account: &StripeAccount) -> &'static str {
    if account.is_rejected() {
        "Rejected"
    } else if account.payouts_enabled {
        "Active"
    } else if account.is_submitted() {
        "Submitted"
    } else {
        "Not submitted"
    }
}

fn business_type(account: &StripeAccount) -> &'static str {
    account.business_type.map(|b| b.as_str()).unwrap_or("")
}

fn account_row(account: &StripeAccount, base: &str, with_owner: bool) -> RowView {
    let mut cells = vec![
        account.display_name(),
        business_type(account).to_string(),
        account.country.clone(),
        account_status(account).to_string(),
    ];
    if with_owner {
        cells.push(account.owner_id().unwrap_or_default().to_string());
    }
    RowView {
        href: Some(format!("{}/stripe-account?stripeid={}", base, account.id)),
        cells,
    }
}

fn account_detail(account: &StripeAccount) -> DetailView {
    let outstanding = account.outstanding_requirements();
    DetailView::new(account.display_name())
        .row("Stripe account", &account.id)
        .row("Type", business_type(account))
        .row("Country", &account.country)
        .row("Status", account_status(account))
        .row("Charges enabled", yes_no(account.charges_enabled))
        .row("Payouts enabled", yes_no(account.payouts_enabled))
        .row("Payment details", yes_no(account.has_payment_details()))
        .row(
            "Outstanding requirements",
            if outstanding.is_empty() {
                "None".to_string()
            } else {
                outstanding.join(", ")
            },
        )
        .row("Created", date(account.created))
}

fn person_detail(person: &Person) -> DetailView {
    let relationship = person.relationship.clone().unwrap_or_default();
    let dob = person
        .dob
        .as_ref()
        .and_then(|dob| Some(format!("{:04}-{:02}-{:02}", dob.year?, dob.month?, dob.day?)))
        .unwrap_or_default();
    DetailView::new(person.full_name())
        .row("Person", &person.id)
        .row("Email", person.email.clone().unwrap_or_default())
        .row("Phone", person.phone.clone().unwrap_or_default())
        .row("Date of birth", dob)
        .row("Title", relationship.title.unwrap_or_default())
        .row(
            "Ownership",
            relationship
                .percent_ownership
                .map(|percent| format!("{}%", percent))
                .unwrap_or_default(),
        )
        .row(
            "Verification",
            person
                .verification
                .as_ref()
                .and_then(|v| v.status.clone())
                .unwrap_or_default(),
        )
        .row("Created", date(person.created))
}

/// Current values of a person, keyed by form field, for the edit forms.
fn set_value(values: &mut BTreeMap<String, String>, name: String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        values.insert(name, value);
    }
}

fn address_values(values: &mut BTreeMap<String, String>, prefix: &str, address: &Address) {
    set_value(values, format!("{prefix}address_line1"), address.line1.clone());
    set_value(values, format!("{prefix}address_line2"), address.line2.clone());
    set_value(values, format!("{prefix}address_city"), address.city.clone());
    set_value(values, format!("{prefix}address_state"), address.state.clone());
    set_value(values, format!("{prefix}address_postal_code"), address.postal_code.clone());
}

/// Contact, birth date and address of `person` under form names with `prefix`.
fn personal_values(values: &mut BTreeMap<String, String>, prefix: &str, person: &Person) {
    set_value(values, format!("{prefix}first_name"), person.first_name.clone());
    set_value(values, format!("{prefix}last_name"), person.last_name.clone());
    set_value(values, format!("{prefix}email"), person.email.clone());
    set_value(values, format!("{prefix}phone"), person.phone.clone());
    if let Some(dob) = &person.dob {
        set_value(values, format!("{prefix}dob_day"), dob.day.map(|d| d.to_string()));
        set_value(values, format!("{prefix}dob_month"), dob.month.map(|m| m.to_string()));
        set_value(values, format!("{prefix}dob_year"), dob.year.map(|y| y.to_string()));
    }
    if let Some(address) = &person.address {
        address_values(values, prefix, address);
    }
}

fn person_values(person: &Person) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    personal_values(&mut values, "", person);
    if let Some(relationship) = &person.relationship {
        set_value(&mut values, "relationship_title".to_string(), relationship.title.clone());
        set_value(
            &mut values,
            "relationship_percent_ownership".to_string(),
            relationship.percent_ownership.map(|p| p.to_string()),
        );
    }
    values
}

/// The registration Stripe already holds, as form values. Stripe never
/// returns tax ids, so those inputs stay empty.
fn account_values(account: &StripeAccount) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    if let Some(profile) = &account.business_profile {
        set_value(&mut values, "business_profile_mcc".to_string(), profile.mcc.clone());
        set_value(&mut values, "business_profile_url".to_string(), profile.url.clone());
        set_value(
            &mut values,
            "business_profile_product_description".to_string(),
            profile.product_description.clone(),
        );
    }
    if let Some(company) = &account.company {
        set_value(&mut values, "company_name".to_string(), company.name.clone());
        set_value(&mut values, "company_phone".to_string(), company.phone.clone());
        if let Some(address) = &company.address {
            address_values(&mut values, "company_", address);
        }
    }
    if let Some(individual) = &account.individual {
        personal_values(&mut values, "individual_", individual);
    }
    values
}

fn payout_row(payout: &Payout, base: &str) -> RowView {
    RowView {
        href: Some(format!("{}/payout?payoutid={}", base, payout.id)),
        cells: vec![
            payout.id.clone(),
            amount(payout),
            payout.status.clone().unwrap_or_default(),
            date(payout.arrival_date),
        ],
    }
}

fn payout_detail(payout: &Payout) -> DetailView {
    DetailView::new(format!("Payout {}", payout.id))
        .row("Payout", &payout.id)
        .row("Amount", amount(payout))
        .row("Status", payout.status.clone().unwrap_or_default())
        .row("Description", payout.description.clone().unwrap_or_default())
        .row("Arrival", date(payout.arrival_date))
        .row("Created", date(payout.created))
}

const PAYOUT_COLUMNS: &[&str] = &["Payout", "Amount", "Status", "Arrival"];

// --- Stripe accounts ---

pub async fn stripe_accounts_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::list_stripe_accounts(&state, &caller, &page)
        .await
        .map(|accounts| {
            let url = format!("{}/stripe-accounts", USER_BASE);
            let mut list = ListView::new("Stripe accounts", &["Account", "Type", "Country", "Status"])
                .with_pages(accounts.total, &page, state.page_size(), &url);
            list.rows = accounts
                .items
                .iter()
                .map(|account| account_row(account, USER_BASE, false))
                .collect();
            list.actions.push(LinkView::new(
                format!("{}/create-stripe-account", USER_BASE),
                "Create Stripe account",
            ));
            list.message = query.banner();
            list
        });
    show("stripe-accounts", result)
}

pub async fn stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let result = load_owned_account(&state, &caller, query.stripeid.as_deref())
        .await
        .map(|account| {
            let mut detail = account_detail(&account);
            detail.navbar = navbar(&state, &account);
            detail.message = query.banner();
            detail.actions.push(LinkView::new(
                user_url("delete-stripe-account", &account.id),
                "Delete Stripe account",
            ));
            detail
        });
    show("stripe-account", result)
}

fn create_account_form(state: &ConnectState) -> FormView {
    let mut form = FormView::new(
        "Create Stripe account",
        format!("{}/create-stripe-account", USER_BASE),
    );
    form.fields.push(FieldView::select(
        "type",
        &[("company", "Company"), ("individual", "Individual")],
    ));
    let countries = logic::supported_countries(state);
    let options: Vec<(&str, &str)> = countries
        .iter()
        .map(|country| (country.id.as_str(), country.name.as_str()))
        .collect();
    form.fields.push(FieldView::select("country", &options));
    form.submit_label = "Create".to_string();
    form
}

pub async fn create_stripe_account_form_page(
    State(state): State<Arc<ConnectState>>,
    _caller: DashboardAccount,
) -> Response {
    render(&create_account_form(&state))
}

pub async fn create_stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    submission: FormSubmission,
) -> Response {
    match logic::create_stripe_account(&state, &caller, &submission).await {
        Ok(account) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-account", USER_BASE),
            &[("stripeid", account.id.as_str())],
        ),
        Err(err) => form_failed(
            "create-stripe-account",
            err,
            Ok(create_account_form(&state)),
            &submission.fields,
        ),
    }
}

// --- Registration and payment details ---

async fn registration_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    kind: EntityKind,
) -> Result<FormView, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    let path = if kind == EntityKind::Individual {
        require_individual(&account)?;
        "edit-individual-registration"
    } else {
        require_company(&account)?;
        "edit-company-registration"
    };
    require_not_submitted(&account)?;
    let entity = entity_of(state, &account, kind)?;
    let mut form = entity_form(entity, "Registration", user_url(path, &account.id))
        .with_values(&account_values(&account));
    form.navbar = navbar(state, &account);
    Ok(tokenized(form, state, "account", Some(business_type(&account))))
}

async fn registration_post(
    state: &ConnectState,
    caller: DashboardAccount,
    query: PageQuery,
    submission: FormSubmission,
    kind: EntityKind,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    let values = submission.fields.clone();
    let result = if kind == EntityKind::Individual {
        logic::update_individual_registration(state, &caller, stripe_id, submission).await
    } else {
        logic::update_company_registration(state, &caller, stripe_id, submission).await
    };
    match result {
        Ok(account) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-account", USER_BASE),
            &[("stripeid", account.id.as_str())],
        ),
        Err(err) => {
            let form = registration_form(state, &caller, stripe_id, kind).await;
            form_failed("edit-registration", err, form, &values)
        }
    }
}

pub async fn edit_company_registration_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let form =
        registration_form(&state, &caller, query.stripeid.as_deref(), EntityKind::Company).await;
    show("edit-company-registration", form)
}

pub async fn update_company_registration_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    submission: FormSubmission,
) -> Response {
    registration_post(&state, caller, query, submission, EntityKind::Company).await
}

pub async fn edit_individual_registration_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let form =
        registration_form(&state, &caller, query.stripeid.as_deref(), EntityKind::Individual)
            .await;
    show("edit-individual-registration", form)
}

pub async fn update_individual_registration_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    submission: FormSubmission,
) -> Response {
    registration_post(&state, caller, query, submission, EntityKind::Individual).await
}

async fn payment_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    let entity = entity_of(state, &account, EntityKind::Payment)?;
    let mut form = entity_form(
        entity,
        "Payment details",
        user_url("edit-payment-details", &account.id),
    );
    form.intro = Some("Payouts are sent to this bank account.".to_string());
    form.navbar = navbar(state, &account);
    Ok(form)
}

pub async fn edit_payment_details_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    show(
        "edit-payment-details",
        payment_form(&state, &caller, query.stripeid.as_deref()).await,
    )
}

pub async fn update_payment_details_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    submission: FormSubmission,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    let values = submission.fields.clone();
    match logic::update_payment_details(&state, &caller, stripe_id, submission).await {
        Ok(account) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-account", USER_BASE),
            &[("stripeid", account.id.as_str())],
        ),
        Err(err) => {
            let form = payment_form(&state, &caller, stripe_id).await;
            form_failed("edit-payment-details", err, form, &values)
        }
    }
}

// --- Company representative ---

async fn representative_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let (account, representative) =
        logic::get_company_representative(state, caller, stripe_id).await?;
    require_not_submitted(&account)?;
    let entity = entity_of(state, &account, EntityKind::Representative)?;
    let title = if representative.is_some() {
        "Edit company representative"
    } else {
        "Create company representative"
    };
    let mut form = entity_form(
        entity,
        title,
        user_url("edit-company-representative", &account.id),
    );
    if let Some(person) = &representative {
        form = form.with_values(&person_values(person));
    }
    form.navbar = navbar(state, &account);
    Ok(tokenized(form, state, "person", None))
}

pub async fn edit_company_representative_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    show(
        "edit-company-representative",
        representative_form(&state, &caller, query.stripeid.as_deref()).await,
    )
}

/// Creates the representative on first save and updates it afterwards.
pub async fn update_company_representative_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    submission: FormSubmission,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    let values = submission.fields.clone();
    let result = match logic::get_company_representative(&state, &caller, stripe_id).await {
        Ok((_, Some(_))) => {
            logic::update_company_representative(&state, &caller, stripe_id, submission).await
        }
        Ok((_, None)) => {
            logic::create_company_representative(&state, &caller, stripe_id, submission).await
        }
        Err(err) => Err(err),
    };
    match result {
        Ok(_) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-account", USER_BASE),
            &[("stripeid", stripe_id.unwrap_or_default())],
        ),
        Err(err) => {
            let form = representative_form(&state, &caller, stripe_id).await;
            form_failed("edit-company-representative", err, form, &values)
        }
    }
}

// --- Beneficial owners and company directors ---
// Parameterised by role; see routes::person_page_routes.

pub async fn persons_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
    page: PaginationQuery,
) -> Response {
    let result = logic::list_persons(&state, &caller, query.stripeid.as_deref(), role, &page)
        .await
        .map(|(account, persons)| {
            let url = user_url(role.plural_slug(), &account.id);
            let mut list = ListView::new(role.plural_title(), &["Name", "Email", "Created"])
                .with_pages(persons.total, &page, state.page_size(), &url);
            list.rows = persons
                .items
                .iter()
                .map(|person| RowView {
                    href: Some(person_url(role, "", &person.id)),
                    cells: vec![
                        person.full_name(),
                        person.email.clone().unwrap_or_default(),
                        date(person.created),
                    ],
                })
                .collect();
            if require_role_open(&account, role).is_ok() {
                list.actions.push(LinkView::new(
                    user_url(&format!("create-{}", role.slug()), &account.id),
                    format!("Add {}", role.title().to_lowercase()),
                ));
                list.actions.push(LinkView::new(
                    user_url(&format!("submit-{}", role.plural_slug()), &account.id),
                    format!("Submit {}", role.plural_title().to_lowercase()),
                ));
            }
            list.navbar = navbar(&state, &account);
            list.message = query.banner();
            list
        });
    show(role.plural_slug(), result)
}

pub async fn person_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let result = logic::get_person(&state, &caller, query.personid.as_deref(), role)
        .await
        .map(|(account, person)| {
            let mut detail = person_detail(&person);
            if require_role_open(&account, role).is_ok() {
                detail.actions.push(LinkView::new(
                    person_url(role, "edit-", &person.id),
                    format!("Edit {}", role.title().to_lowercase()),
                ));
                detail.actions.push(LinkView::new(
                    person_url(role, "delete-", &person.id),
                    format!("Delete {}", role.title().to_lowercase()),
                ));
            }
            detail.navbar = navbar(&state, &account);
            detail.message = query.banner();
            detail
        });
    show(role.slug(), result)
}

async fn create_person_form(
    role: PersonRole,
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    let entity = entity_of(state, &account, role.entity_kind())?;
    require_role_open(&account, role)?;
    let mut form = entity_form(
        entity,
        format!("Add {}", role.title().to_lowercase()),
        user_url(&format!("create-{}", role.slug()), &account.id),
    );
    form.navbar = navbar(state, &account);
    Ok(tokenized(form, state, "person", None))
}

pub async fn create_person_form_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let form = create_person_form(role, &state, &caller, query.stripeid.as_deref()).await;
    show(role.slug(), form)
}

pub async fn create_person_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
    submission: FormSubmission,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    let values = submission.fields.clone();
    match logic::create_person(&state, &caller, stripe_id, role, submission).await {
        Ok(_) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/{}", USER_BASE, role.plural_slug()),
            &[("stripeid", stripe_id.unwrap_or_default())],
        ),
        Err(err) => {
            let form = create_person_form(role, &state, &caller, stripe_id).await;
            form_failed(role.slug(), err, form, &values)
        }
    }
}

async fn edit_person_form(
    role: PersonRole,
    state: &ConnectState,
    caller: &DashboardAccount,
    person_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let (account, person) = logic::get_person(state, caller, person_id, role).await?;
    require_role_open(&account, role)?;
    let entity = entity_of(state, &account, role.entity_kind())?;
    let mut form = entity_form(
        entity,
        format!("Edit {}", role.title().to_lowercase()),
        person_url(role, "edit-", &person.id),
    )
    .with_values(&person_values(&person));
    form.navbar = navbar(state, &account);
    Ok(tokenized(form, state, "person", None))
}

pub async fn edit_person_form_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let form = edit_person_form(role, &state, &caller, query.personid.as_deref()).await;
    show(role.slug(), form)
}

pub async fn update_person_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
    submission: FormSubmission,
) -> Response {
    let person_id = query.personid.as_deref();
    let values = submission.fields.clone();
    match logic::update_person(&state, &caller, person_id, role, submission).await {
        Ok(person) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/{}", USER_BASE, role.slug()),
            &[("personid", person.id.as_str())],
        ),
        Err(err) => {
            let form = edit_person_form(role, &state, &caller, person_id).await;
            form_failed(role.slug(), err, form, &values)
        }
    }
}

async fn delete_person_form(
    role: PersonRole,
    state: &ConnectState,
    caller: &DashboardAccount,
    person_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let (account, person) = logic::get_person(state, caller, person_id, role).await?;
    require_role_open(&account, role)?;
    let mut form = confirm_form(
        format!("Delete {}", role.title().to_lowercase()),
        person_url(role, "delete-", &person.id),
        format!("{} will be removed from the registration.", person.full_name()),
        "Delete",
    );
    form.navbar = navbar(state, &account);
    Ok(form)
}

pub async fn delete_person_form_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let form = delete_person_form(role, &state, &caller, query.personid.as_deref()).await;
    show(role.slug(), form)
}

pub async fn delete_person_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let person_id = query.personid.as_deref();
    // The person is gone afterwards; remember where it belonged.
    let stripe_id = match person_id {
        Some(id) => state.index.stripe_id_for_person(id.trim()).await,
        None => None,
    };
    match logic::delete_person(&state, &caller, person_id, role).await {
        Ok(_) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/{}", USER_BASE, role.plural_slug()),
            &[("stripeid", stripe_id.as_deref().unwrap_or_default())],
        ),
        Err(err) => {
            let form = delete_person_form(role, &state, &caller, person_id).await;
            form_failed(role.slug(), err, form, &BTreeMap::new())
        }
    }
}

async fn submit_persons_form(
    role: PersonRole,
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    entity_of(state, &account, role.entity_kind())?;
    require_role_open(&account, role)?;
    let mut form = confirm_form(
        format!("Submit {}", role.plural_title().to_lowercase()),
        user_url(&format!("submit-{}", role.plural_slug()), &account.id),
        format!(
            "Confirm that every {} of the company has been added. Companies without any can submit straight away.",
            role.title().to_lowercase()
        ),
        "Submit",
    );
    form.navbar = navbar(state, &account);
    Ok(form)
}

pub async fn submit_persons_form_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let form = submit_persons_form(role, &state, &caller, query.stripeid.as_deref()).await;
    show(role.plural_slug(), form)
}

pub async fn submit_persons_page(
    role: PersonRole,
    state: Arc<ConnectState>,
    caller: DashboardAccount,
    query: PageQuery,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    match logic::submit_persons(&state, &caller, stripe_id, role).await {
        Ok(account) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/{}", USER_BASE, role.plural_slug()),
            &[("stripeid", account.id.as_str())],
        ),
        Err(err) => {
            let form = submit_persons_form(role, &state, &caller, stripe_id).await;
            form_failed(role.plural_slug(), err, form, &BTreeMap::new())
        }
    }
}

// --- Submission and deletion ---

async fn submit_account_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_not_submitted(&account)?;
    let mut form = confirm_form(
        "Submit registration",
        user_url("submit-stripe-account", &account.id),
        "Submitting accepts the Stripe Connected Account Agreement.".to_string(),
        "Submit registration",
    );
    form.navbar = navbar(state, &account);
    if let Some(blocker) = logic::submission_blocker(state, &account).await? {
        form = form.with_error(&blocker);
    }
    Ok(form)
}

pub async fn submit_stripe_account_form_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    show(
        "submit-stripe-account",
        submit_account_form(&state, &caller, query.stripeid.as_deref()).await,
    )
}

pub async fn submit_stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    match logic::submit_stripe_account(&state, &caller, stripe_id).await {
        Ok(account) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-account", USER_BASE),
            &[("stripeid", account.id.as_str())],
        ),
        Err(err) => {
            let form = submit_account_form(&state, &caller, stripe_id).await;
            form_failed("submit-stripe-account", err, form, &BTreeMap::new())
        }
    }
}

async fn delete_account_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    let mut form = confirm_form(
        "Delete Stripe account",
        user_url("delete-stripe-account", &account.id),
        format!("{} will be deleted on Stripe.", account.display_name()),
        "Delete",
    );
    form.navbar = navbar(state, &account);
    Ok(form)
}

pub async fn delete_stripe_account_form_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    show(
        "delete-stripe-account",
        delete_account_form(&state, &caller, query.stripeid.as_deref()).await,
    )
}

pub async fn delete_stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    match logic::delete_stripe_account(&state, &caller, stripe_id).await {
        Ok(_) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-accounts", USER_BASE),
            &[],
        ),
        Err(err) => {
            let form = delete_account_form(&state, &caller, stripe_id).await;
            form_failed("delete-stripe-account", err, form, &BTreeMap::new())
        }
    }
}

// --- Payouts ---

pub async fn payouts_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::list_payouts(&state, &caller, query.stripeid.as_deref(), &page)
        .await
        .map(|(account, payouts)| {
            let url = user_url("payouts", &account.id);
            let mut list = ListView::new("Payouts", PAYOUT_COLUMNS).with_pages(
                payouts.total,
                &page,
                state.page_size(),
                &url,
            );
            list.rows = payouts
                .items
                .iter()
                .map(|payout| payout_row(payout, USER_BASE))
                .collect();
            list.navbar = navbar(&state, &account);
            list
        });
    show("payouts", result)
}

pub async fn payout_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let result = logic::get_payout(&state, &caller, query.payoutid.as_deref())
        .await
        .map(|payout| payout_detail(&payout));
    show("payout", result)
}

// --- Administrator ---

pub async fn admin_stripe_accounts_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::admin_list_stripe_accounts(&state, &caller, &page)
        .await
        .map(|accounts| {
            let url = format!("{}/stripe-accounts", ADMIN_BASE);
            let mut list = ListView::new(
                "Stripe accounts",
                &["Account", "Type", "Country", "Status", "Owner"],
            )
            .with_pages(accounts.total, &page, state.page_size(), &url);
            list.rows = accounts
                .items
                .iter()
                .map(|account| account_row(account, ADMIN_BASE, true))
                .collect();
            list.message = query.banner();
            list
        });
    show("administrator stripe-accounts", result)
}

pub async fn admin_stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let result = logic::admin_get_stripe_account(&state, &caller, query.stripeid.as_deref())
        .await
        .map(|account| {
            let mut detail = account_detail(&account)
                .row("Owner", account.owner_id().unwrap_or_default());
            detail.message = query.banner();
            detail.actions = vec![
                LinkView::new(admin_url("payouts", &account.id), "Payouts"),
                LinkView::new(
                    admin_url("reject-stripe-account", &account.id),
                    "Reject Stripe account",
                ),
                LinkView::new(
                    admin_url("delete-stripe-account", &account.id),
                    "Delete Stripe account",
                ),
            ];
            detail
        });
    show("administrator stripe-account", result)
}

async fn reject_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_account_as_administrator(state, caller, stripe_id).await?;
    let mut form = FormView::new(
        format!("Reject {}", account.display_name()),
        admin_url("reject-stripe-account", &account.id),
    );
    let options: Vec<(&str, String)> = REJECT_REASONS
        .iter()
        .map(|reason| (*reason, crate::fields::label(reason)))
        .collect();
    let options: Vec<(&str, &str)> = options
        .iter()
        .map(|(value, label)| (*value, label.as_str()))
        .collect();
    form.fields.push(FieldView::select("reason", &options));
    form.submit_label = "Reject".to_string();
    Ok(form)
}

pub async fn admin_reject_stripe_account_form_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    show(
        "set-stripe-account-rejected",
        reject_form(&state, &caller, query.stripeid.as_deref()).await,
    )
}

pub async fn admin_reject_stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    submission: FormSubmission,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    let reason = submission.get("reason");
    match logic::admin_reject_stripe_account(&state, &caller, stripe_id, reason).await {
        Ok(account) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-account", ADMIN_BASE),
            &[("stripeid", account.id.as_str())],
        ),
        Err(err) => {
            let form = reject_form(&state, &caller, stripe_id).await;
            form_failed("set-stripe-account-rejected", err, form, &submission.fields)
        }
    }
}

async fn admin_delete_form(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<FormView, ConnectError> {
    let account = load_account_as_administrator(state, caller, stripe_id).await?;
    Ok(confirm_form(
        "Delete Stripe account",
        admin_url("delete-stripe-account", &account.id),
        format!("{} will be deleted on Stripe.", account.display_name()),
        "Delete",
    ))
}

pub async fn admin_delete_stripe_account_form_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    show(
        "administrator delete-stripe-account",
        admin_delete_form(&state, &caller, query.stripeid.as_deref()).await,
    )
}

pub async fn admin_delete_stripe_account_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let stripe_id = query.stripeid.as_deref();
    match logic::admin_delete_stripe_account(&state, &caller, stripe_id).await {
        Ok(_) => success_redirect(
            query.return_url.as_deref(),
            &format!("{}/stripe-accounts", ADMIN_BASE),
            &[],
        ),
        Err(err) => {
            let form = admin_delete_form(&state, &caller, stripe_id).await;
            form_failed(
                "administrator delete-stripe-account",
                err,
                form,
                &BTreeMap::new(),
            )
        }
    }
}

pub async fn admin_payouts_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
    Query(page): Query<PaginationQuery>,
) -> Response {
    let result = logic::admin_list_payouts(&state, &caller, query.stripeid.as_deref(), &page)
        .await
        .map(|(account, payouts)| {
            let url = admin_url("payouts", &account.id);
            let mut list = ListView::new(format!("Payouts of {}", account.display_name()), PAYOUT_COLUMNS)
                .with_pages(payouts.total, &page, state.page_size(), &url);
            list.rows = payouts
                .items
                .iter()
                .map(|payout| payout_row(payout, ADMIN_BASE))
                .collect();
            list
        });
    show("administrator payouts", result)
}

pub async fn admin_payout_page(
    State(state): State<Arc<ConnectState>>,
    caller: DashboardAccount,
    Query(query): Query<PageQuery>,
) -> Response {
    let result = logic::admin_get_payout(&state, &caller, query.payoutid.as_deref())
        .await
        .map(|payout| payout_detail(&payout));
    show("administrator payout", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_formatting() {
        let payout = Payout {
            amount: 123456,
            currency: "eur".to_string(),
            ..Payout::default()
        };
        assert_eq!(amount(&payout), "1234.56 EUR");
        let refund = Payout {
            amount: -5,
            currency: "usd".to_string(),
            ..Payout::default()
        };
        assert_eq!(amount(&refund), "-0.05 USD");
    }

    #[test]
    fn test_date_formatting() {
        assert_eq!(date(Some(1_700_000_000)), "2023-11-14");
        assert_eq!(date(None), "");
    }

    #[test]
    fn test_person_values_use_form_names() {
        let person: Person = serde_json::from_value(serde_json::json!({
            "id": "person_1",
            "first_name": "Erika",
            "last_name": "Mustermann",
            "dob": { "day": 12, "month": 8, "year": 1964 },
            "relationship": { "owner": true, "percent_ownership": 30.0 }
        }))
        .unwrap();
        let values = person_values(&person);
        assert_eq!(values["first_name"], "Erika");
        assert_eq!(values["dob_month"], "8");
        assert_eq!(values["relationship_percent_ownership"], "30");
        assert!(!values.contains_key("email"));
    }

    #[test]
    fn test_account_values_use_registration_names() {
        let account: StripeAccount = serde_json::from_value(serde_json::json!({
            "id": "acct_1",
            "business_type": "individual",
            "business_profile": { "mcc": "5734", "url": "https://example.com" },
            "individual": {
                "first_name": "Erika",
                "dob": { "day": 12, "month": 8, "year": 1964 },
                "address": { "city": "Berlin", "postal_code": "10115" }
            }
        }))
        .unwrap();
        let values = account_values(&account);
        assert_eq!(values["business_profile_mcc"], "5734");
        assert_eq!(values["individual_first_name"], "Erika");
        assert_eq!(values["individual_dob_year"], "1964");
        assert_eq!(values["individual_address_city"], "Berlin");
        assert!(!values.contains_key("company_name"));

        let company: StripeAccount = serde_json::from_value(serde_json::json!({
            "id": "acct_2",
            "business_type": "company",
            "company": {
                "name": "Beispiel GmbH",
                "address": { "line1": "Hauptstr. 1" }
            }
        }))
        .unwrap();
        let values = account_values(&company);
        assert_eq!(values["company_name"], "Beispiel GmbH");
        assert_eq!(values["company_address_line1"], "Hauptstr. 1");
        assert!(!values.contains_key("company_tax_id"));
    }
}
