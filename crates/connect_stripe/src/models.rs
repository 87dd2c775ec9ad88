// --- File: crates/connect_stripe/src/models.rs ---
//! Typed views of the Stripe objects this crate reads.
//!
//! Everything here is owned by Stripe. Only the fields the forms, guards and
//! views look at are modelled; unknown fields are ignored on deserialize.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Metadata key holding the dashboard account that created the Stripe account.
pub const METADATA_ACCOUNT_ID: &str = "accountid";
/// Metadata key holding the submission timestamp.
pub const METADATA_SUBMITTED: &str = "submitted";

/// Represents the list object returned by Stripe API.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeList<T> {
    #[serde(default)]
    pub object: String, // "list"
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub url: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Company,
    Individual,
    #[serde(other)]
    Other,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Company => "company",
            BusinessType::Individual => "individual",
            BusinessType::Other => "other",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Dob {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<u32>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Requirements {
    #[serde(default)]
    pub currently_due: Vec<String>,
    #[serde(default)]
    pub eventually_due: Vec<String>,
    #[serde(default)]
    pub past_due: Vec<String>,
    pub disabled_reason: Option<String>,
    pub current_deadline: Option<i64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Company {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    #[serde(default)]
    pub tax_id_provided: bool,
    #[serde(default)]
    pub owners_provided: bool,
    #[serde(default)]
    pub directors_provided: bool,
    #[serde(default)]
    pub executives_provided: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Relationship {
    #[serde(default)]
    pub representative: bool,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub director: bool,
    #[serde(default)]
    pub executive: bool,
    pub title: Option<String>,
    pub percent_ownership: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct VerificationDocument {
    pub front: Option<String>,
    pub back: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Verification {
    pub status: Option<String>,
    pub document: Option<VerificationDocument>,
    pub additional_document: Option<VerificationDocument>,
}

/// A person attached to a company account, or the individual of an
/// individual account.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Person {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub account: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<Dob>,
    pub address: Option<Address>,
    pub relationship: Option<Relationship>,
    pub requirements: Option<Requirements>,
    pub verification: Option<Verification>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created: Option<i64>,
}

impl Person {
    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{} {}", first, last).trim().to_string()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ExternalAccount {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub bank_name: Option<String>,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub last4: Option<String>,
    pub account_holder_name: Option<String>,
    pub account_holder_type: Option<String>,
    #[serde(default)]
    pub default_for_currency: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BusinessProfile {
    pub mcc: Option<String>,
    pub url: Option<String>,
    pub product_description: Option<String>,
}

/// A connected (custom) account.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeAccount {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub business_type: Option<BusinessType>,
    #[serde(default)]
    pub country: String,
    pub default_currency: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub business_profile: Option<BusinessProfile>,
    pub company: Option<Company>,
    pub individual: Option<Person>,
    pub requirements: Option<Requirements>,
    pub external_accounts: Option<StripeList<ExternalAccount>>,
    pub created: Option<i64>,
}

impl StripeAccount {
    /// Dashboard account that owns this Stripe account.
    pub fn owner_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_ACCOUNT_ID).map(String::as_str)
    }

    pub fn is_company(&self) -> bool {
        self.business_type == Some(BusinessType::Company)
    }

    pub fn is_individual(&self) -> bool {
        self.business_type == Some(BusinessType::Individual)
    }

    pub fn is_submitted(&self) -> bool {
        self.metadata
            .get(METADATA_SUBMITTED)
            .is_some_and(|value| !value.is_empty())
    }

    pub fn owners_submitted(&self) -> bool {
        self.company.as_ref().is_some_and(|c| c.owners_provided)
    }

    pub fn directors_submitted(&self) -> bool {
        self.company.as_ref().is_some_and(|c| c.directors_provided)
    }

    pub fn has_payment_details(&self) -> bool {
        self.external_accounts
            .as_ref()
            .is_some_and(|list| !list.data.is_empty())
    }

    pub fn is_rejected(&self) -> bool {
        self.requirements
            .as_ref()
            .and_then(|r| r.disabled_reason.as_deref())
            .is_some_and(|reason| reason.starts_with("rejected"))
    }

    /// Requirements still blocking submission. Terms-of-service acceptance
    /// is recorded by the submission itself and the bank account has its own
    /// check, so neither counts here.
    pub fn outstanding_requirements(&self) -> Vec<&str> {
        self.requirements
            .as_ref()
            .map(|r| {
                r.currently_due
                    .iter()
                    .map(String::as_str)
                    .filter(|field| !field.starts_with("tos_acceptance.") && *field != "external_account")
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        let name = if self.is_company() {
            self.company.as_ref().and_then(|c| c.name.clone())
        } else {
            self.individual.as_ref().map(Person::full_name)
        };
        name.filter(|n| !n.is_empty()).unwrap_or_else(|| self.id.clone())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Payout {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    pub arrival_date: Option<i64>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub destination: Option<String>,
    pub created: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CountrySpec {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub default_currency: Option<String>,
    #[serde(default)]
    pub supported_bank_account_currencies: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub supported_payment_currencies: Vec<String>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub verification_fields: serde_json::Value,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StripeFile {
    pub id: String,
    pub purpose: Option<String>,
    pub filename: Option<String>,
}

/// A verification document received from a form, on its way to the files API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A supported country as listed by the country-specs endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SupportedCountry {
    pub id: String,
    pub name: String,
    pub company: bool,
    pub individual: bool,
}
