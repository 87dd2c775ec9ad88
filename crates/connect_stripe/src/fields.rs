// --- File: crates/connect_stripe/src/fields.rs ---
//! The form field catalog.
//!
//! Every form field the dashboard accepts is listed here once, per entity,
//! with the Stripe parameter it is sent as. Country tables refer to these
//! names and are checked against this catalog when they load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// The kinds of registration data a country table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    Individual,
    Representative,
    BeneficialOwner,
    Director,
    Payment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Company,
        EntityKind::Individual,
        EntityKind::Representative,
        EntityKind::BeneficialOwner,
        EntityKind::Director,
        EntityKind::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Company => "company",
            EntityKind::Individual => "individual",
            EntityKind::Representative => "representative",
            EntityKind::BeneficialOwner => "beneficial_owner",
            EntityKind::Director => "director",
            EntityKind::Payment => "payment",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn catalog(&self) -> &'static [FieldSpec] {
        match self {
            EntityKind::Company => COMPANY_FIELDS,
            EntityKind::Individual => INDIVIDUAL_FIELDS,
            EntityKind::Representative | EntityKind::BeneficialOwner | EntityKind::Director => {
                PERSON_FIELDS
            }
            EntityKind::Payment => PAYMENT_FIELDS,
        }
    }

    pub fn spec(&self, name: &str) -> Option<&'static FieldSpec> {
        self.catalog().iter().find(|spec| spec.name == name)
    }

    /// Parameters always sent with this kind of data, whatever the form held.
    fn fixed_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            EntityKind::Representative => &[
                ("relationship[representative]", "true"),
                ("relationship[executive]", "true"),
            ],
            EntityKind::BeneficialOwner => &[("relationship[owner]", "true")],
            EntityKind::Director => &[("relationship[director]", "true")],
            EntityKind::Payment => &[("external_account[object]", "bank_account")],
            EntityKind::Company | EntityKind::Individual => &[],
        }
    }
}

/// The person roles a company account registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PersonRole {
    Representative,
    BeneficialOwner,
    Director,
}

impl PersonRole {
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            PersonRole::Representative => EntityKind::Representative,
            PersonRole::BeneficialOwner => EntityKind::BeneficialOwner,
            PersonRole::Director => EntityKind::Director,
        }
    }

    /// Value of the `relationship[...]` filter when listing persons.
    pub fn relationship(&self) -> &'static str {
        match self {
            PersonRole::Representative => "representative",
            PersonRole::BeneficialOwner => "owner",
            PersonRole::Director => "director",
        }
    }

    /// URL segment, e.g. `beneficial-owner` in `create-beneficial-owner`.
    pub fn slug(&self) -> &'static str {
        match self {
            PersonRole::Representative => "company-representative",
            PersonRole::BeneficialOwner => "beneficial-owner",
            PersonRole::Director => "company-director",
        }
    }

    /// Plural URL segment, e.g. `beneficial-owners`.
    pub fn plural_slug(&self) -> &'static str {
        match self {
            PersonRole::Representative => "company-representatives",
            PersonRole::BeneficialOwner => "beneficial-owners",
            PersonRole::Director => "company-directors",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PersonRole::Representative => "Company representative",
            PersonRole::BeneficialOwner => "Beneficial owner",
            PersonRole::Director => "Company director",
        }
    }

    pub fn plural_title(&self) -> &'static str {
        match self {
            PersonRole::Representative => "Company representatives",
            PersonRole::BeneficialOwner => "Beneficial owners",
            PersonRole::Director => "Company directors",
        }
    }
}

/// Where an upload field's file goes on the files API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    IdentityDocument,
    AdditionalVerification,
}

impl UploadPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPurpose::IdentityDocument => "identity_document",
            UploadPurpose::AdditionalVerification => "additional_verification",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub param: &'static str,
    pub upload: Option<UploadPurpose>,
}

impl FieldSpec {
    /// Whether a Stripe.js account or person token can carry this field.
    /// Account tokens hold only `company[...]` and `individual[...]` data.
    pub fn in_token(&self) -> bool {
        !self.param.starts_with("business_profile[")
            && !self.param.starts_with("external_account[")
    }
}

const fn text(name: &'static str, param: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        param,
        upload: None,
    }
}

const fn file(name: &'static str, param: &'static str, purpose: UploadPurpose) -> FieldSpec {
    FieldSpec {
        name,
        param,
        upload: Some(purpose),
    }
}

use UploadPurpose::{AdditionalVerification, IdentityDocument};

static COMPANY_FIELDS: &[FieldSpec] = &[
    text("business_profile_mcc", "business_profile[mcc]"),
    text("business_profile_url", "business_profile[url]"),
    text(
        "business_profile_product_description",
        "business_profile[product_description]",
    ),
    text("company_name", "company[name]"),
    text("company_tax_id", "company[tax_id]"),
    text("company_registration_number", "company[registration_number]"),
    text("company_vat_id", "company[vat_id]"),
    text("company_phone", "company[phone]"),
    text("company_address_line1", "company[address][line1]"),
    text("company_address_line2", "company[address][line2]"),
    text("company_address_city", "company[address][city]"),
    text("company_address_state", "company[address][state]"),
    text("company_address_postal_code", "company[address][postal_code]"),
    file(
        "company_verification_document_front",
        "company[verification][document][front]",
        AdditionalVerification,
    ),
    file(
        "company_verification_document_back",
        "company[verification][document][back]",
        AdditionalVerification,
    ),
];

static INDIVIDUAL_FIELDS: &[FieldSpec] = &[
    text("business_profile_mcc", "business_profile[mcc]"),
    text("business_profile_url", "business_profile[url]"),
    text(
        "business_profile_product_description",
        "business_profile[product_description]",
    ),
    text("individual_first_name", "individual[first_name]"),
    text("individual_last_name", "individual[last_name]"),
    text("individual_email", "individual[email]"),
    text("individual_phone", "individual[phone]"),
    text("individual_dob_day", "individual[dob][day]"),
    text("individual_dob_month", "individual[dob][month]"),
    text("individual_dob_year", "individual[dob][year]"),
    text("individual_id_number", "individual[id_number]"),
    text("individual_ssn_last_4", "individual[ssn_last_4]"),
    text("individual_address_line1", "individual[address][line1]"),
    text("individual_address_line2", "individual[address][line2]"),
    text("individual_address_city", "individual[address][city]"),
    text("individual_address_state", "individual[address][state]"),
    text("individual_address_postal_code", "individual[address][postal_code]"),
    file(
        "individual_verification_document_front",
        "individual[verification][document][front]",
        IdentityDocument,
    ),
    file(
        "individual_verification_document_back",
        "individual[verification][document][back]",
        IdentityDocument,
    ),
    file(
        "individual_verification_additional_document_front",
        "individual[verification][additional_document][front]",
        AdditionalVerification,
    ),
    file(
        "individual_verification_additional_document_back",
        "individual[verification][additional_document][back]",
        AdditionalVerification,
    ),
];

static PERSON_FIELDS: &[FieldSpec] = &[
    text("first_name", "first_name"),
    text("last_name", "last_name"),
    text("email", "email"),
    text("phone", "phone"),
    text("dob_day", "dob[day]"),
    text("dob_month", "dob[month]"),
    text("dob_year", "dob[year]"),
    text("id_number", "id_number"),
    text("ssn_last_4", "ssn_last_4"),
    text("address_line1", "address[line1]"),
    text("address_line2", "address[line2]"),
    text("address_city", "address[city]"),
    text("address_state", "address[state]"),
    text("address_postal_code", "address[postal_code]"),
    text("relationship_title", "relationship[title]"),
    text("relationship_percent_ownership", "relationship[percent_ownership]"),
    file(
        "verification_document_front",
        "verification[document][front]",
        IdentityDocument,
    ),
    file(
        "verification_document_back",
        "verification[document][back]",
        IdentityDocument,
    ),
    file(
        "verification_additional_document_front",
        "verification[additional_document][front]",
        AdditionalVerification,
    ),
    file(
        "verification_additional_document_back",
        "verification[additional_document][back]",
        AdditionalVerification,
    ),
];

// Routing number parts share one parameter and are joined with "-" in this order.
static PAYMENT_FIELDS: &[FieldSpec] = &[
    text("currency", "external_account[currency]"),
    text("country", "external_account[country]"),
    text("account_holder_name", "external_account[account_holder_name]"),
    text("account_holder_type", "external_account[account_holder_type]"),
    text("iban", "external_account[account_number]"),
    text("account_number", "external_account[account_number]"),
    text("routing_number", "external_account[routing_number]"),
    text("bsb_number", "external_account[routing_number]"),
    text("sort_code", "external_account[routing_number]"),
    text("transit_number", "external_account[routing_number]"),
    text("institution_number", "external_account[routing_number]"),
    text("clearing_code", "external_account[routing_number]"),
    text("bank_code", "external_account[routing_number]"),
    text("branch_code", "external_account[routing_number]"),
];

/// Human label for a field name: `company_tax_id` → `Company tax id`.
pub fn label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The catalog field a Stripe parameter came from, e.g. for mapping an API
/// error back to the form. When several fields share the parameter, the one
/// present in `submitted` wins.
pub fn field_for_param(
    kind: EntityKind,
    param: &str,
    submitted: &BTreeMap<String, String>,
) -> Option<&'static str> {
    let mut candidates = kind.catalog().iter().filter(|spec| spec.param == param);
    let first = candidates.clone().next()?;
    candidates
        .find(|spec| submitted.contains_key(spec.name))
        .or(Some(first))
        .map(|spec| spec.name)
}

/// Builds the form-encoded Stripe parameters for submitted `values`.
///
/// Only catalog fields accepted by `applies` with a non-blank value are sent.
/// Fields sharing a parameter are joined with `-` in catalog order.
pub fn stripe_params<F>(
    kind: EntityKind,
    values: &BTreeMap<String, String>,
    applies: F,
) -> Vec<(String, String)>
where
    F: Fn(&str) -> bool,
{
    let mut params: Vec<(String, String)> = Vec::new();
    for spec in kind.catalog() {
        if !applies(spec.name) {
            continue;
        }
        let Some(value) = values.get(spec.name).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            continue;
        };
        match params.iter_mut().find(|(param, _)| param == spec.param) {
            Some((_, joined)) => {
                joined.push('-');
                joined.push_str(value);
            }
            None => params.push((spec.param.to_string(), value.to_string())),
        }
    }
    params.extend(
        kind.fixed_params()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_catalog_names_are_unique() {
        for kind in EntityKind::ALL {
            let catalog = kind.catalog();
            for (i, spec) in catalog.iter().enumerate() {
                assert!(
                    catalog[i + 1..].iter().all(|other| other.name != spec.name),
                    "duplicate {} in {:?}",
                    spec.name,
                    kind
                );
            }
        }
    }

    #[test]
    fn test_composite_routing_number() {
        let params = stripe_params(
            EntityKind::Payment,
            &values(&[
                ("transit_number", "11000"),
                ("institution_number", "000"),
                ("account_number", "000123456789"),
                ("currency", "cad"),
            ]),
            |_| true,
        );
        assert!(params.contains(&(
            "external_account[routing_number]".to_string(),
            "11000-000".to_string()
        )));
        assert!(params.contains(&(
            "external_account[object]".to_string(),
            "bank_account".to_string()
        )));
    }

    #[test]
    fn test_blank_and_inapplicable_fields_are_dropped() {
        let params = stripe_params(
            EntityKind::Company,
            &values(&[
                ("company_name", "Beispiel GmbH"),
                ("company_vat_id", "  "),
                ("company_tax_id", "HRB 1234"),
                ("not_a_field", "x"),
            ]),
            |name| name != "company_tax_id",
        );
        assert_eq!(
            params,
            vec![("company[name]".to_string(), "Beispiel GmbH".to_string())]
        );
    }

    #[test]
    fn test_role_flags() {
        let params = stripe_params(EntityKind::Representative, &BTreeMap::new(), |_| true);
        assert_eq!(
            params,
            vec![
                ("relationship[representative]".to_string(), "true".to_string()),
                ("relationship[executive]".to_string(), "true".to_string()),
            ]
        );
        let params = stripe_params(EntityKind::Director, &BTreeMap::new(), |_| true);
        assert_eq!(
            params,
            vec![("relationship[director]".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_business_profile_stays_out_of_tokens() {
        let company = EntityKind::Company;
        assert!(!company.spec("business_profile_mcc").unwrap().in_token());
        assert!(company.spec("company_name").unwrap().in_token());
        assert!(company
            .spec("individual_verification_document_front")
            .unwrap()
            .in_token());
        assert!(EntityKind::Director
            .catalog()
            .iter()
            .all(|spec| spec.in_token()));
        assert!(EntityKind::Payment
            .catalog()
            .iter()
            .all(|spec| !spec.in_token()));
    }

    #[test]
    fn test_label_and_reverse_lookup() {
        assert_eq!(label("company_tax_id"), "Company tax id");
        let none = BTreeMap::new();
        assert_eq!(field_for_param(EntityKind::Director, "dob[day]", &none), Some("dob_day"));
        assert_eq!(field_for_param(EntityKind::Payment, "nope", &none), None);
        assert_eq!(
            field_for_param(EntityKind::Payment, "external_account[account_number]", &none),
            Some("iban")
        );
        let submitted = values(&[("account_number", "000123456789")]);
        assert_eq!(
            field_for_param(EntityKind::Payment, "external_account[account_number]", &submitted),
            Some("account_number")
        );
        assert_eq!(EntityKind::from_name("beneficial_owner"), Some(EntityKind::BeneficialOwner));
    }
}
