// --- File: crates/connect_stripe/src/logic.rs ---
//! Connect operations shared by the HTML pages and the JSON API.
//!
//! Each operation runs the guards for the entities it names, turns the form
//! into Stripe parameters and makes the API call. Surfaces only differ in how
//! they render the result.

use chrono::Utc;
use connect_common::{paginate, PaginationQuery};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::client::Params;
use crate::countries::EntityFields;
use crate::error::ConnectError;
use crate::fields::{EntityKind, PersonRole};
use crate::forms::FormSubmission;
use crate::guards::{
    entity_of, load_account_as_administrator, load_owned_account, load_owned_person,
    require_administrator, require_company, require_individual, require_not_submitted,
    require_role_open,
};
use crate::handlers::ConnectState;
use crate::models::{
    BusinessType, CountrySpec, Payout, Person, StripeAccount, SupportedCountry,
    METADATA_ACCOUNT_ID, METADATA_SUBMITTED,
};
use crate::session::DashboardAccount;

/// One page of a list plus the size of the whole list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Reasons Stripe accepts when an account is rejected.
pub const REJECT_REASONS: [&str; 3] = ["fraud", "terms_of_service", "other"];

const ACCOUNT_TOKEN: (&str, &str) = ("account_token", "ct_");
const PERSON_TOKEN: (&str, &str) = ("person_token", "cpt_");

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Validates the submitted fields against the country's table and uploads
/// any verification documents, replacing each with its Stripe file id.
async fn prepare_fields(
    state: &ConnectState,
    stripe_id: &str,
    entity: &EntityFields,
    submission: FormSubmission,
) -> Result<BTreeMap<String, String>, ConnectError> {
    let FormSubmission {
        mut fields,
        uploads,
    } = submission;

    let mut presence = fields.clone();
    for (name, upload) in &uploads {
        presence.insert(name.clone(), upload.file_name.clone());
    }
    entity.validate(&presence)?;

    for (name, upload) in uploads {
        let Some(purpose) = entity
            .kind()
            .spec(&name)
            .filter(|_| entity.applies(&name))
            .and_then(|spec| spec.upload)
        else {
            continue;
        };
        let file = state
            .api
            .upload_file(stripe_id, upload, purpose.as_str())
            .await
            .map_err(|e| {
                warn!("[Connect] Upload of {} failed: {}", name, e);
                ConnectError::InvalidField(name.clone())
            })?;
        fields.insert(name, file.id);
    }
    Ok(fields)
}

/// Parameters for a registration or person form.
///
/// With Stripe.js enabled the browser has tokenized every field a token can
/// carry, verification documents included, so only the token and the fields
/// outside it (the business profile) are sent.
async fn entity_params(
    state: &ConnectState,
    stripe_id: &str,
    entity: &EntityFields,
    submission: FormSubmission,
    token: (&str, &str),
) -> Result<(Params, BTreeMap<String, String>), ConnectError> {
    if !state.uses_stripe_js() {
        let fields = prepare_fields(state, stripe_id, entity, submission).await?;
        return Ok((entity.stripe_params(&fields), fields));
    }

    let (token_param, prefix) = token;
    let token_value = submission
        .get("token")
        .filter(|value| value.starts_with(prefix))
        .ok_or(ConnectError::InvalidToken)?
        .to_string();
    if let Some(name) = submission.uploads.keys().next() {
        warn!("[Connect] {} was posted beside a token instead of inside it", name);
        return Err(ConnectError::InvalidField(name.clone()));
    }

    // Stripe checks the tokenized fields when the token is created.
    let mut presence = submission.fields.clone();
    let mut plain = BTreeMap::new();
    for (spec, _) in entity.fields() {
        if spec.in_token() {
            presence.insert(spec.name.to_string(), token_value.clone());
        } else if let Some(value) = submission.fields.get(spec.name) {
            plain.insert(spec.name.to_string(), value.clone());
        }
    }
    entity.validate(&presence)?;

    let mut params = vec![param(token_param, token_value)];
    params.extend(entity.stripe_params(&plain));
    Ok((params, plain))
}

// --- Stripe accounts ---

pub async fn create_stripe_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    submission: &FormSubmission,
) -> Result<StripeAccount, ConnectError> {
    let business_type = match submission.get("type") {
        Some("company") => BusinessType::Company,
        Some("individual") => BusinessType::Individual,
        _ => return Err(ConnectError::InvalidType),
    };
    let kind = match business_type {
        BusinessType::Individual => EntityKind::Individual,
        _ => EntityKind::Company,
    };
    let country = submission
        .get("country")
        .and_then(|code| state.countries.get(code))
        .filter(|country| country.supports(kind))
        .ok_or(ConnectError::InvalidCountry)?;

    let params = vec![
        param("type", "custom"),
        param("country", country.id.as_str()),
        param("business_type", business_type.as_str()),
        param("capabilities[card_payments][requested]", "true"),
        param("capabilities[transfers][requested]", "true"),
        param(&format!("metadata[{}]", METADATA_ACCOUNT_ID), caller.account_id.as_str()),
    ];
    let account = state.api.create_account(params).await?;
    state
        .index
        .add_stripe_account(&caller.account_id, &account.id)
        .await;
    info!(
        "[Connect] Created {} Stripe account {} in {} for {}",
        business_type.as_str(),
        account.id,
        country.id,
        caller.account_id
    );
    Ok(account)
}

async fn fetch_accounts(
    state: &ConnectState,
    ids: Vec<String>,
    query: &PaginationQuery,
) -> Result<Page<StripeAccount>, ConnectError> {
    let total = ids.len();
    let mut items = Vec::new();
    for stripe_id in paginate(ids, query, state.page_size()) {
        items.push(state.api.retrieve_account(&stripe_id).await?);
    }
    Ok(Page { items, total })
}

pub async fn list_stripe_accounts(
    state: &ConnectState,
    caller: &DashboardAccount,
    query: &PaginationQuery,
) -> Result<Page<StripeAccount>, ConnectError> {
    let ids = state.index.stripe_accounts(&caller.account_id).await;
    fetch_accounts(state, ids, query).await
}

pub async fn count_stripe_accounts(state: &ConnectState, caller: &DashboardAccount) -> usize {
    state.index.stripe_accounts(&caller.account_id).await.len()
}

pub async fn update_company_registration(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    submission: FormSubmission,
) -> Result<StripeAccount, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    require_not_submitted(&account)?;
    update_registration(state, &account, EntityKind::Company, submission).await
}

pub async fn update_individual_registration(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    submission: FormSubmission,
) -> Result<StripeAccount, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_individual(&account)?;
    require_not_submitted(&account)?;
    update_registration(state, &account, EntityKind::Individual, submission).await
}

async fn update_registration(
    state: &ConnectState,
    account: &StripeAccount,
    kind: EntityKind,
    submission: FormSubmission,
) -> Result<StripeAccount, ConnectError> {
    let entity = entity_of(state, account, kind)?;
    let (params, submitted) =
        entity_params(state, &account.id, entity, submission, ACCOUNT_TOKEN).await?;
    let updated = state
        .api
        .update_account(&account.id, params)
        .await
        .map_err(|e| ConnectError::from_stripe(kind, &submitted, e))?;
    info!("[Connect] Updated {} registration of {}", kind.as_str(), account.id);
    Ok(updated)
}

pub async fn update_payment_details(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    submission: FormSubmission,
) -> Result<StripeAccount, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    let entity = entity_of(state, &account, EntityKind::Payment)?;
    let fields = prepare_fields(state, &account.id, entity, submission).await?;
    let params = entity.stripe_params(&fields);
    let updated = state
        .api
        .update_account(&account.id, params)
        .await
        .map_err(|e| ConnectError::from_stripe(EntityKind::Payment, &fields, e))?;
    info!("[Connect] Updated payment details of {}", account.id);
    Ok(updated)
}

/// Why `account` cannot be submitted yet, if anything.
pub async fn submission_blocker(
    state: &ConnectState,
    account: &StripeAccount,
) -> Result<Option<ConnectError>, ConnectError> {
    if !account.has_payment_details() {
        return Ok(Some(ConnectError::InvalidPaymentDetails));
    }
    if account.is_company() {
        let representatives = state
            .api
            .list_persons(&account.id, PersonRole::Representative)
            .await?;
        if representatives.is_empty() {
            return Ok(Some(ConnectError::InvalidCompanyRepresentative));
        }
        let country = crate::guards::country_of(state, account)?;
        if country.supports(EntityKind::BeneficialOwner) && !account.owners_submitted() {
            return Ok(Some(ConnectError::InvalidBeneficialOwners));
        }
        if country.supports(EntityKind::Director) && !account.directors_submitted() {
            return Ok(Some(ConnectError::InvalidCompanyDirectors));
        }
    }
    if !account.outstanding_requirements().is_empty() {
        return Ok(Some(ConnectError::InvalidRegistration));
    }
    Ok(None)
}

pub async fn submit_stripe_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_not_submitted(&account)?;
    if let Some(blocker) = submission_blocker(state, &account).await? {
        return Err(blocker);
    }
    let ip = caller.ip.as_deref().ok_or(ConnectError::InvalidRegistration)?;

    let now = Utc::now().timestamp().to_string();
    let mut params = vec![
        param("tos_acceptance[date]", now.as_str()),
        param("tos_acceptance[ip]", ip),
    ];
    if let Some(user_agent) = caller.user_agent.as_deref() {
        params.push(param("tos_acceptance[user_agent]", user_agent));
    }
    params.push(param(&format!("metadata[{}]", METADATA_SUBMITTED), now));

    let submitted = state.api.update_account(&account.id, params).await?;
    info!("[Connect] Submitted Stripe account {}", account.id);
    Ok(submitted)
}

pub async fn delete_stripe_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    state.api.delete_account(&account.id).await?;
    state
        .index
        .remove_stripe_account(&caller.account_id, &account.id)
        .await;
    info!("[Connect] Deleted Stripe account {}", account.id);
    Ok(account)
}

// --- Persons ---

pub async fn company_representative(
    state: &ConnectState,
    account: &StripeAccount,
) -> Result<Option<Person>, ConnectError> {
    let representatives = state
        .api
        .list_persons(&account.id, PersonRole::Representative)
        .await?;
    let representative = representatives.into_iter().next();
    if let Some(person) = &representative {
        state.index.add_person(&account.id, &person.id).await;
    }
    Ok(representative)
}

pub async fn get_company_representative(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<(StripeAccount, Option<Person>), ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    let representative = company_representative(state, &account).await?;
    Ok((account, representative))
}

pub async fn create_company_representative(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    submission: FormSubmission,
) -> Result<Person, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    require_not_submitted(&account)?;
    if company_representative(state, &account).await?.is_some() {
        return Err(ConnectError::InvalidCompanyRepresentative);
    }
    create_role_person(state, &account, PersonRole::Representative, submission).await
}

pub async fn update_company_representative(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    submission: FormSubmission,
) -> Result<Person, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    require_not_submitted(&account)?;
    let representative = company_representative(state, &account)
        .await?
        .ok_or(ConnectError::InvalidCompanyRepresentative)?;
    update_role_person(
        state,
        &account,
        &representative,
        PersonRole::Representative,
        submission,
    )
    .await
}

async fn create_role_person(
    state: &ConnectState,
    account: &StripeAccount,
    role: PersonRole,
    submission: FormSubmission,
) -> Result<Person, ConnectError> {
    let kind = role.entity_kind();
    let entity = entity_of(state, account, kind)?;
    let (params, submitted) =
        entity_params(state, &account.id, entity, submission, PERSON_TOKEN).await?;
    let person = state
        .api
        .create_person(&account.id, params)
        .await
        .map_err(|e| ConnectError::from_stripe(kind, &submitted, e))?;
    state.index.add_person(&account.id, &person.id).await;
    info!(
        "[Connect] Created {} {} on {}",
        role.relationship(),
        person.id,
        account.id
    );
    Ok(person)
}

async fn update_role_person(
    state: &ConnectState,
    account: &StripeAccount,
    person: &Person,
    role: PersonRole,
    submission: FormSubmission,
) -> Result<Person, ConnectError> {
    let kind = role.entity_kind();
    let entity = entity_of(state, account, kind)?;
    let (params, submitted) =
        entity_params(state, &account.id, entity, submission, PERSON_TOKEN).await?;
    let updated = state
        .api
        .update_person(&account.id, &person.id, params)
        .await
        .map_err(|e| ConnectError::from_stripe(kind, &submitted, e))?;
    info!("[Connect] Updated {} {}", role.relationship(), person.id);
    Ok(updated)
}

/// Account, country support and submission-state checks shared by every
/// owner/director operation.
async fn load_role_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    role: PersonRole,
) -> Result<StripeAccount, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    require_company(&account)?;
    entity_of(state, &account, role.entity_kind())?;
    Ok(account)
}

pub async fn list_persons(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    role: PersonRole,
    query: &PaginationQuery,
) -> Result<(StripeAccount, Page<Person>), ConnectError> {
    let account = load_role_account(state, caller, stripe_id, role).await?;
    let persons = state.api.list_persons(&account.id, role).await?;
    for person in &persons {
        state.index.add_person(&account.id, &person.id).await;
    }
    let total = persons.len();
    let items = paginate(persons, query, state.page_size());
    Ok((account, Page { items, total }))
}

pub async fn count_persons(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    role: PersonRole,
) -> Result<usize, ConnectError> {
    let account = load_role_account(state, caller, stripe_id, role).await?;
    Ok(state.api.list_persons(&account.id, role).await?.len())
}

pub async fn get_person(
    state: &ConnectState,
    caller: &DashboardAccount,
    person_id: Option<&str>,
    role: PersonRole,
) -> Result<(StripeAccount, Person), ConnectError> {
    let (account, person) = load_owned_person(state, caller, person_id, role).await?;
    require_company(&account)?;
    Ok((account, person))
}

pub async fn create_person(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    role: PersonRole,
    submission: FormSubmission,
) -> Result<Person, ConnectError> {
    let account = load_role_account(state, caller, stripe_id, role).await?;
    require_role_open(&account, role)?;
    create_role_person(state, &account, role, submission).await
}

pub async fn update_person(
    state: &ConnectState,
    caller: &DashboardAccount,
    person_id: Option<&str>,
    role: PersonRole,
    submission: FormSubmission,
) -> Result<Person, ConnectError> {
    let (account, person) = load_owned_person(state, caller, person_id, role).await?;
    require_company(&account)?;
    require_role_open(&account, role)?;
    update_role_person(state, &account, &person, role, submission).await
}

pub async fn delete_person(
    state: &ConnectState,
    caller: &DashboardAccount,
    person_id: Option<&str>,
    role: PersonRole,
) -> Result<Person, ConnectError> {
    let (account, person) = load_owned_person(state, caller, person_id, role).await?;
    require_company(&account)?;
    require_role_open(&account, role)?;
    state.api.delete_person(&account.id, &person.id).await?;
    state.index.remove_person(&person.id).await;
    info!("[Connect] Deleted {} {}", role.relationship(), person.id);
    Ok(person)
}

/// Marks the account's owners or directors as complete. Zero persons is a
/// valid submission.
pub async fn submit_persons(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    role: PersonRole,
) -> Result<StripeAccount, ConnectError> {
    let account = load_role_account(state, caller, stripe_id, role).await?;
    require_role_open(&account, role)?;
    let flag = match role {
        PersonRole::BeneficialOwner => "company[owners_provided]",
        PersonRole::Director => "company[directors_provided]",
        PersonRole::Representative => return Err(ConnectError::InvalidStripeAccount),
    };
    let updated = state
        .api
        .update_account(&account.id, vec![param(flag, "true")])
        .await?;
    info!("[Connect] Submitted {} of {}", role.plural_slug(), account.id);
    Ok(updated)
}

// --- Payouts ---

async fn account_payouts(
    state: &ConnectState,
    account: &StripeAccount,
    query: &PaginationQuery,
) -> Result<Page<Payout>, ConnectError> {
    let payouts = state.api.list_payouts(&account.id).await?;
    for payout in &payouts {
        state.index.add_payout(&account.id, &payout.id).await;
    }
    let total = payouts.len();
    let items = paginate(payouts, query, state.page_size());
    Ok(Page { items, total })
}

pub async fn list_payouts(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    query: &PaginationQuery,
) -> Result<(StripeAccount, Page<Payout>), ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    let page = account_payouts(state, &account, query).await?;
    Ok((account, page))
}

pub async fn count_payouts(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<usize, ConnectError> {
    let account = load_owned_account(state, caller, stripe_id).await?;
    Ok(state.api.list_payouts(&account.id).await?.len())
}

async fn indexed_payout(
    state: &ConnectState,
    payout_id: Option<&str>,
) -> Result<(String, String), ConnectError> {
    let payout_id = payout_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ConnectError::InvalidPayoutId)?;
    let stripe_id = state
        .index
        .stripe_id_for_payout(payout_id)
        .await
        .ok_or(ConnectError::InvalidPayoutId)?;
    Ok((stripe_id, payout_id.to_string()))
}

pub async fn get_payout(
    state: &ConnectState,
    caller: &DashboardAccount,
    payout_id: Option<&str>,
) -> Result<Payout, ConnectError> {
    let (stripe_id, payout_id) = indexed_payout(state, payout_id).await?;
    match load_owned_account(state, caller, Some(&stripe_id)).await {
        Ok(_) => {}
        Err(ConnectError::InvalidStripeId) => return Err(ConnectError::InvalidPayoutId),
        Err(other) => return Err(other),
    }
    state
        .api
        .retrieve_payout(&stripe_id, &payout_id)
        .await
        .map_err(|e| {
            warn!("[Connect] Could not load payout {}: {}", payout_id, e);
            ConnectError::InvalidPayoutId
        })
}

// --- Countries ---

pub async fn country_spec(
    state: &ConnectState,
    country_id: Option<&str>,
) -> Result<CountrySpec, ConnectError> {
    let country = country_id
        .and_then(|code| state.countries.get(code.trim()))
        .ok_or(ConnectError::InvalidCountryId)?;
    Ok(state.api.retrieve_country_spec(&country.id).await?)
}

pub fn supported_countries(state: &ConnectState) -> Vec<SupportedCountry> {
    state.countries.supported_countries()
}

// --- Administrator ---

pub async fn admin_list_stripe_accounts(
    state: &ConnectState,
    caller: &DashboardAccount,
    query: &PaginationQuery,
) -> Result<Page<StripeAccount>, ConnectError> {
    require_administrator(caller)?;
    let ids = state.index.all_stripe_accounts().await;
    fetch_accounts(state, ids, query).await
}

pub async fn admin_count_stripe_accounts(
    state: &ConnectState,
    caller: &DashboardAccount,
) -> Result<usize, ConnectError> {
    require_administrator(caller)?;
    Ok(state.index.all_stripe_accounts().await.len())
}

pub async fn admin_get_stripe_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    load_account_as_administrator(state, caller, stripe_id).await
}

pub async fn admin_list_payouts(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    query: &PaginationQuery,
) -> Result<(StripeAccount, Page<Payout>), ConnectError> {
    let account = load_account_as_administrator(state, caller, stripe_id).await?;
    let page = account_payouts(state, &account, query).await?;
    Ok((account, page))
}

pub async fn admin_get_payout(
    state: &ConnectState,
    caller: &DashboardAccount,
    payout_id: Option<&str>,
) -> Result<Payout, ConnectError> {
    require_administrator(caller)?;
    let (stripe_id, payout_id) = indexed_payout(state, payout_id).await?;
    state
        .api
        .retrieve_payout(&stripe_id, &payout_id)
        .await
        .map_err(|e| {
            warn!("[Connect] Could not load payout {}: {}", payout_id, e);
            ConnectError::InvalidPayoutId
        })
}

pub async fn admin_reject_stripe_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
    reason: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    let account = load_account_as_administrator(state, caller, stripe_id).await?;
    let reason = reason
        .filter(|reason| REJECT_REASONS.contains(reason))
        .ok_or(ConnectError::InvalidReason)?;
    let rejected = state.api.reject_account(&account.id, reason).await?;
    info!(
        "[Connect] Administrator {} rejected {} ({})",
        caller.account_id, account.id, reason
    );
    Ok(rejected)
}

pub async fn admin_delete_stripe_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    let account = load_account_as_administrator(state, caller, stripe_id).await?;
    state.api.delete_account(&account.id).await?;
    if let Some(owner) = account.owner_id() {
        state.index.remove_stripe_account(owner, &account.id).await;
    }
    info!(
        "[Connect] Administrator {} deleted {}",
        caller.account_id, account.id
    );
    Ok(account)
}
