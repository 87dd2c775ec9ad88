// --- File: crates/connect_stripe/src/countries.rs ---
//! Per-country registration tables.
//!
//! The table ships inside the binary (`data/countries.toml`) and is checked
//! against the field catalog when it loads, so a typo in a field name fails
//! at startup instead of silently dropping a form field.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

use crate::error::ConnectError;
use crate::fields::{EntityKind, FieldSpec};
use crate::models::SupportedCountry;

const EMBEDDED_TABLE: &str = include_str!("../data/countries.toml");

#[derive(Error, Debug)]
pub enum CountryTableError {
    #[error("Failed to parse country table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid country code: {0}")]
    InvalidCode(String),

    #[error("Country {country} uses unknown profile {profile}")]
    UnknownProfile { country: String, profile: String },

    #[error("Unknown entity {entity} in {location}")]
    UnknownEntity { location: String, entity: String },

    #[error("Unknown field {field} for {entity} in {location}")]
    UnknownField {
        location: String,
        entity: &'static str,
        field: String,
    },

    #[error("Field {field} listed twice for {entity} in {location}")]
    DuplicateField {
        location: String,
        entity: &'static str,
        field: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Optional,
}

/// The fields one entity takes in one country, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFields {
    kind: EntityKind,
    rules: Vec<(&'static FieldSpec, FieldRule)>,
}

impl EntityFields {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn rule(&self, name: &str) -> Option<FieldRule> {
        self.rules
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, rule)| *rule)
    }

    pub fn applies(&self, name: &str) -> bool {
        self.rule(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldSpec, FieldRule)> + '_ {
        self.rules.iter().copied()
    }

    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules
            .iter()
            .filter(|(_, rule)| *rule == FieldRule::Required)
            .map(|(spec, _)| spec.name)
    }

    /// Fails with the first required field (catalog order) that is missing
    /// or blank.
    pub fn validate(&self, values: &BTreeMap<String, String>) -> Result<(), ConnectError> {
        for name in self.required() {
            let present = values.get(name).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(ConnectError::InvalidField(name.to_string()));
            }
        }
        Ok(())
    }

    /// The Stripe parameters for `values`, limited to this country's fields.
    pub fn stripe_params(&self, values: &BTreeMap<String, String>) -> Vec<(String, String)> {
        crate::fields::stripe_params(self.kind, values, |name| self.applies(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryCapabilities {
    pub id: String,
    pub name: String,
    entities: BTreeMap<EntityKind, EntityFields>,
}

impl CountryCapabilities {
    pub fn entity(&self, kind: EntityKind) -> Option<&EntityFields> {
        self.entities.get(&kind)
    }

    pub fn supports(&self, kind: EntityKind) -> bool {
        self.entities.contains_key(&kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryTable {
    countries: BTreeMap<String, CountryCapabilities>,
}

#[derive(Deserialize)]
struct RawTable {
    #[serde(default)]
    profiles: BTreeMap<String, BTreeMap<String, RawEntity>>,
    #[serde(default)]
    countries: BTreeMap<String, RawCountry>,
}

#[derive(Deserialize, Clone)]
struct RawEntity {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    optional: Vec<String>,
}

#[derive(Deserialize)]
struct RawCountry {
    name: String,
    profile: String,
    #[serde(default)]
    unsupported: Vec<String>,
    #[serde(flatten)]
    overrides: BTreeMap<String, RawEntity>,
}

impl CountryTable {
    /// The table compiled into the crate.
    pub fn embedded() -> Result<Self, CountryTableError> {
        let table = Self::parse(EMBEDDED_TABLE)?;
        info!("[Countries] Loaded {} supported countries", table.countries.len());
        Ok(table)
    }

    pub fn parse(source: &str) -> Result<Self, CountryTableError> {
        let raw: RawTable = toml::from_str(source)?;

        let mut profiles: BTreeMap<String, BTreeMap<EntityKind, EntityFields>> = BTreeMap::new();
        for (profile_name, entities) in &raw.profiles {
            let location = format!("profile {}", profile_name);
            profiles.insert(profile_name.clone(), build_entities(&location, entities)?);
        }

        let mut countries = BTreeMap::new();
        for (code, country) in raw.countries {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(CountryTableError::InvalidCode(code));
            }
            let mut entities = profiles
                .get(&country.profile)
                .cloned()
                .ok_or_else(|| CountryTableError::UnknownProfile {
                    country: code.clone(),
                    profile: country.profile.clone(),
                })?;

            let location = format!("country {}", code);
            entities.extend(build_entities(&location, &country.overrides)?);

            for entity in &country.unsupported {
                let kind = EntityKind::from_name(entity).ok_or_else(|| {
                    CountryTableError::UnknownEntity {
                        location: location.clone(),
                        entity: entity.clone(),
                    }
                })?;
                entities.remove(&kind);
            }

            countries.insert(
                code.clone(),
                CountryCapabilities {
                    id: code,
                    name: country.name,
                    entities,
                },
            );
        }

        Ok(CountryTable { countries })
    }

    pub fn get(&self, code: &str) -> Option<&CountryCapabilities> {
        self.countries.get(&code.to_ascii_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountryCapabilities> {
        self.countries.values()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn supported_countries(&self) -> Vec<SupportedCountry> {
        self.iter()
            .map(|country| SupportedCountry {
                id: country.id.clone(),
                name: country.name.clone(),
                company: country.supports(EntityKind::Company),
                individual: country.supports(EntityKind::Individual),
            })
            .collect()
    }
}

fn build_entities(
    location: &str,
    raw: &BTreeMap<String, RawEntity>,
) -> Result<BTreeMap<EntityKind, EntityFields>, CountryTableError> {
    let mut entities = BTreeMap::new();
    for (entity, fields) in raw {
        let kind = EntityKind::from_name(entity).ok_or_else(|| CountryTableError::UnknownEntity {
            location: location.to_string(),
            entity: entity.clone(),
        })?;
        entities.insert(kind, build_fields(location, kind, fields)?);
    }
    Ok(entities)
}

fn build_fields(
    location: &str,
    kind: EntityKind,
    raw: &RawEntity,
) -> Result<EntityFields, CountryTableError> {
    let mut seen = BTreeSet::new();
    let listed = raw
        .required
        .iter()
        .map(|f| (f, FieldRule::Required))
        .chain(raw.optional.iter().map(|f| (f, FieldRule::Optional)));

    let mut by_name = BTreeMap::new();
    for (field, rule) in listed {
        if kind.spec(field).is_none() {
            return Err(CountryTableError::UnknownField {
                location: location.to_string(),
                entity: kind.as_str(),
                field: field.clone(),
            });
        }
        if !seen.insert(field.as_str()) {
            return Err(CountryTableError::DuplicateField {
                location: location.to_string(),
                entity: kind.as_str(),
                field: field.clone(),
            });
        }
        by_name.insert(field.as_str(), rule);
    }

    let rules = kind
        .catalog()
        .iter()
        .filter_map(|spec| by_name.get(spec.name).map(|rule| (spec, *rule)))
        .collect();
    Ok(EntityFields { kind, rules })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_TABLE: &str = r#"
        [profiles.basic.company]
        required = ["company_name", "company_tax_id"]
        optional = ["company_vat_id"]

        [profiles.basic.payment]
        required = ["currency", "iban"]

        [countries.DE]
        name = "Germany"
        profile = "basic"

        [countries.GB]
        name = "United Kingdom"
        profile = "basic"
        unsupported = ["company"]

        [countries.GB.payment]
        required = ["currency", "sort_code", "account_number"]
    "#;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_profile_and_overrides() {
        let table = CountryTable::parse(SMALL_TABLE).unwrap();
        assert_eq!(table.len(), 2);

        let de = table.get("de").unwrap();
        let company = de.entity(EntityKind::Company).unwrap();
        assert_eq!(company.rule("company_name"), Some(FieldRule::Required));
        assert_eq!(company.rule("company_vat_id"), Some(FieldRule::Optional));
        assert_eq!(company.rule("company_phone"), None);
        assert!(!de.supports(EntityKind::Director));

        let gb = table.get("GB").unwrap();
        assert!(!gb.supports(EntityKind::Company));
        let payment = gb.entity(EntityKind::Payment).unwrap();
        assert!(payment.applies("sort_code"));
        assert!(!payment.applies("iban"));
    }

    #[test]
    fn test_validate_reports_first_missing_field_in_catalog_order() {
        let table = CountryTable::parse(SMALL_TABLE).unwrap();
        let company = table.get("DE").unwrap().entity(EntityKind::Company).unwrap();

        let err = company.validate(&values(&[("company_vat_id", "DE1")])).unwrap_err();
        assert!(matches!(err, ConnectError::InvalidField(ref f) if f == "company_name"));

        let err = company
            .validate(&values(&[("company_name", "Beispiel"), ("company_tax_id", " ")]))
            .unwrap_err();
        assert!(matches!(err, ConnectError::InvalidField(ref f) if f == "company_tax_id"));

        assert!(company
            .validate(&values(&[("company_name", "Beispiel"), ("company_tax_id", "1")]))
            .is_ok());
    }

    #[test]
    fn test_rejects_bad_tables() {
        let unknown_field = r#"
            [profiles.p.company]
            required = ["company_nmae"]
        "#;
        assert!(matches!(
            CountryTable::parse(unknown_field),
            Err(CountryTableError::UnknownField { .. })
        ));

        let duplicate = r#"
            [profiles.p.company]
            required = ["company_name"]
            optional = ["company_name"]
        "#;
        assert!(matches!(
            CountryTable::parse(duplicate),
            Err(CountryTableError::DuplicateField { .. })
        ));

        let unknown_profile = r#"
            [countries.DE]
            name = "Germany"
            profile = "missing"
        "#;
        assert!(matches!(
            CountryTable::parse(unknown_profile),
            Err(CountryTableError::UnknownProfile { .. })
        ));

        let bad_code = r#"
            [profiles.p.company]
            required = ["company_name"]

            [countries.Germany]
            name = "Germany"
            profile = "p"
        "#;
        assert!(matches!(
            CountryTable::parse(bad_code),
            Err(CountryTableError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_embedded_table_loads() {
        let table = CountryTable::embedded().unwrap();
        let de = table.get("DE").unwrap();
        assert!(de.supports(EntityKind::BeneficialOwner));
        assert!(de.supports(EntityKind::Director));
        assert!(!table.get("US").unwrap().supports(EntityKind::Director));
        assert!(table.get("JP").is_none());
        assert!(table
            .supported_countries()
            .iter()
            .all(|c| c.company && c.individual));
    }
}
