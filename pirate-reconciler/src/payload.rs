//! Typed view over an aligned job's `hsds_candidate` JSON, just enough of
//! the HSDS field catalogue for the merge to operate on structs instead of
//! walking `serde_json::Value` by hand. Fields the catalogue allows but the
//! reconciler never reads (e.g. most of `metadata`) are parsed as opaque
//! JSON and carried through unexamined.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct AlignedPayload {
    #[serde(default)]
    pub organization: Vec<OrganizationInput>,
    #[serde(default)]
    pub service: Vec<ServiceInput>,
    #[serde(default)]
    pub location: Vec<LocationInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Vec<PhoneInput>,
    #[serde(default)]
    pub language: Vec<LanguageInput>,
    #[serde(default)]
    pub organization_identifier: Vec<IdentifierInput>,
    #[serde(default)]
    pub metadata: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub service_at_location: Vec<ServiceAtLocationInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAtLocationInput {
    pub location_id: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Vec<AddressInput>,
    #[serde(default)]
    pub phone: Vec<PhoneInput>,
    #[serde(default)]
    pub schedule: Vec<ScheduleInput>,
    #[serde(default)]
    pub accessibility: Vec<Value>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub address_1: String,
    pub city: String,
    pub state_province: String,
    pub postal_code: String,
    #[serde(default)]
    pub address_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneInput {
    pub number: String,
    #[serde(default)]
    pub phone_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageInput {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentifierInput {
    pub identifier_type: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    #[serde(default)]
    pub freq: Option<String>,
    #[serde(default)]
    pub opens_at: Option<String>,
    #[serde(default)]
    pub closes_at: Option<String>,
}

/// Normalize a phone number to its digits, the set-union key for merging
/// phone lists across sources.
pub fn normalize_phone(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize an address to its set-union key: case-insensitive
/// `(address_1, city, state, postal_code)`.
pub fn normalize_address_key(addr: &AddressInput) -> String {
    format!(
        "{}|{}|{}|{}",
        addr.address_1.to_lowercase(),
        addr.city.to_lowercase(),
        addr.state_province.to_lowercase(),
        addr.postal_code.to_lowercase()
    )
}
