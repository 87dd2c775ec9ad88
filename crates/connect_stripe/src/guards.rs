// --- File: crates/connect_stripe/src/guards.rs ---
//! Loading and checking the entities a request names, before any handler
//! acts on them.

use tracing::warn;

use crate::countries::{CountryCapabilities, EntityFields};
use crate::error::ConnectError;
use crate::fields::{EntityKind, PersonRole};
use crate::handlers::ConnectState;
use crate::models::{Person, StripeAccount};
use crate::session::DashboardAccount;

fn present(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

/// The Stripe account `stripe_id`, if it belongs to the caller.
pub async fn load_owned_account(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    let stripe_id = present(stripe_id).ok_or(ConnectError::InvalidStripeId)?;
    let account = state.api.retrieve_account(stripe_id).await.map_err(|e| {
        warn!("[Connect] Could not load Stripe account {}: {}", stripe_id, e);
        ConnectError::InvalidStripeId
    })?;
    if account.owner_id() != Some(caller.account_id.as_str()) {
        warn!(
            "[Connect] {} tried to access Stripe account {}",
            caller.account_id, stripe_id
        );
        return Err(ConnectError::InvalidAccount);
    }
    Ok(account)
}

/// Any Stripe account, for administrators only.
pub async fn load_account_as_administrator(
    state: &ConnectState,
    caller: &DashboardAccount,
    stripe_id: Option<&str>,
) -> Result<StripeAccount, ConnectError> {
    require_administrator(caller)?;
    let stripe_id = present(stripe_id).ok_or(ConnectError::InvalidStripeId)?;
    state.api.retrieve_account(stripe_id).await.map_err(|e| {
        warn!("[Connect] Could not load Stripe account {}: {}", stripe_id, e);
        ConnectError::InvalidStripeId
    })
}

/// The person `person_id` in the given role, with its account, if the
/// account belongs to the caller.
pub async fn load_owned_person(
    state: &ConnectState,
    caller: &DashboardAccount,
    person_id: Option<&str>,
    role: PersonRole,
) -> Result<(StripeAccount, Person), ConnectError> {
    let person_id = present(person_id).ok_or(ConnectError::InvalidPersonId)?;
    let stripe_id = state
        .index
        .stripe_id_for_person(person_id)
        .await
        .ok_or(ConnectError::InvalidPersonId)?;
    let account = match load_owned_account(state, caller, Some(&stripe_id)).await {
        Ok(account) => account,
        Err(ConnectError::InvalidStripeId) => return Err(ConnectError::InvalidPersonId),
        Err(other) => return Err(other),
    };
    let person = state
        .api
        .retrieve_person(&stripe_id, person_id)
        .await
        .map_err(|e| {
            warn!("[Connect] Could not load person {}: {}", person_id, e);
            ConnectError::InvalidPersonId
        })?;
    if !has_role(&person, role) {
        return Err(ConnectError::InvalidPersonId);
    }
    Ok((account, person))
}

pub fn has_role(person: &Person, role: PersonRole) -> bool {
    person.relationship.as_ref().is_some_and(|r| match role {
        PersonRole::Representative => r.representative,
        PersonRole::BeneficialOwner => r.owner,
        PersonRole::Director => r.director,
    })
}

pub fn require_administrator(caller: &DashboardAccount) -> Result<(), ConnectError> {
    if caller.administrator {
        Ok(())
    } else {
        Err(ConnectError::InvalidAccount)
    }
}

pub fn require_company(account: &StripeAccount) -> Result<(), ConnectError> {
    if account.is_company() {
        Ok(())
    } else {
        Err(ConnectError::InvalidStripeAccount)
    }
}

pub fn require_individual(account: &StripeAccount) -> Result<(), ConnectError> {
    if account.is_individual() {
        Ok(())
    } else {
        Err(ConnectError::InvalidStripeAccount)
    }
}

pub fn require_not_submitted(account: &StripeAccount) -> Result<(), ConnectError> {
    if account.is_submitted() {
        Err(ConnectError::InvalidStripeAccount)
    } else {
        Ok(())
    }
}

/// Owners or directors can still be added, changed or removed.
pub fn require_role_open(account: &StripeAccount, role: PersonRole) -> Result<(), ConnectError> {
    require_not_submitted(account)?;
    let provided = match role {
        PersonRole::Representative => false,
        PersonRole::BeneficialOwner => account.owners_submitted(),
        PersonRole::Director => account.directors_submitted(),
    };
    if provided {
        Err(ConnectError::InvalidStripeAccount)
    } else {
        Ok(())
    }
}

/// The country table entry for the account's country.
pub fn country_of<'a>(
    state: &'a ConnectState,
    account: &StripeAccount,
) -> Result<&'a CountryCapabilities, ConnectError> {
    state.countries.get(&account.country).ok_or_else(|| {
        warn!(
            "[Connect] Stripe account {} is in unsupported country {}",
            account.id, account.country
        );
        ConnectError::InvalidStripeAccount
    })
}

/// The fields `kind` takes in the account's country; unsupported entities
/// refuse the operation.
pub fn entity_of<'a>(
    state: &'a ConnectState,
    account: &StripeAccount,
    kind: EntityKind,
) -> Result<&'a EntityFields, ConnectError> {
    country_of(state, account)?
        .entity(kind)
        .ok_or(ConnectError::InvalidStripeAccount)
}
