//! The HSDS field catalogue: for each entity in `{organization, service,
//! location}` and their transitive children, the field name, its scalar
//! type, an optional format token, and whether it is required. This stands
//! in for the published HSDS CSV schema, which [`crate::schema`] converts
//! into JSON Schema the same way a CSV-driven code generator would.

/// Scalar JSON Schema type a field can carry (HSDS has no object-typed
/// leaf fields; nested entities are modeled as separate child tables, not
/// embedded objects, mirroring the source CSV schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
}

/// A recognized HSDS format token and the JSON Schema constraint it maps
/// to, per the pipeline's format-token table.
#[derive(Debug, Clone, Copy)]
pub enum FormatToken {
    Uri,
    Email,
    Year,
    TimeOfDay,
    Iso639,
    Iso3361,
    CurrencyCode,
    Latitude,
    Longitude,
    Timezone,
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub field_type: FieldType,
    pub format: Option<FormatToken>,
    pub required: bool,
}

const fn field(name: &'static str, field_type: FieldType, required: bool) -> FieldDef {
    FieldDef { name, field_type, format: None, required }
}

const fn formatted(name: &'static str, field_type: FieldType, format: FormatToken, required: bool) -> FieldDef {
    FieldDef { name, field_type, format: Some(format), required }
}

/// HSDS entity names this catalogue covers: the three top-level entities
/// the spec names plus their transitive children.
pub const ENTITIES: &[&str] = &[
    "organization",
    "service",
    "location",
    "address",
    "phone",
    "schedule",
    "language",
    "accessibility",
    "organization_identifier",
    "metadata",
    "service_at_location",
];

pub fn fields_for(entity: &str) -> Option<&'static [FieldDef]> {
    match entity {
        "organization" => Some(ORGANIZATION),
        "service" => Some(SERVICE),
        "location" => Some(LOCATION),
        "address" => Some(ADDRESS),
        "phone" => Some(PHONE),
        "schedule" => Some(SCHEDULE),
        "language" => Some(LANGUAGE),
        "accessibility" => Some(ACCESSIBILITY),
        "organization_identifier" => Some(ORGANIZATION_IDENTIFIER),
        "metadata" => Some(METADATA),
        "service_at_location" => Some(SERVICE_AT_LOCATION),
        _ => None,
    }
}

static ORGANIZATION: &[FieldDef] = &[
    field("id", FieldType::String, true),
    field("name", FieldType::String, true),
    field("description", FieldType::String, false),
    formatted("uri", FieldType::String, FormatToken::Uri, false),
    formatted("email", FieldType::String, FormatToken::Email, false),
    formatted("year_incorporated", FieldType::String, FormatToken::Year, false),
    field("legal_status", FieldType::String, false),
];

static SERVICE: &[FieldDef] = &[
    field("id", FieldType::String, true),
    field("organization_id", FieldType::String, false),
    field("name", FieldType::String, true),
    formatted(
        "status",
        FieldType::String,
        FormatToken::Enum(&["active", "inactive", "defunct", "temporarily closed"]),
        true,
    ),
    field("description", FieldType::String, false),
    formatted("url", FieldType::String, FormatToken::Uri, false),
    formatted("email", FieldType::String, FormatToken::Email, false),
];

static LOCATION: &[FieldDef] = &[
    field("id", FieldType::String, true),
    field("name", FieldType::String, false),
    field("description", FieldType::String, false),
    formatted("latitude", FieldType::Number, FormatToken::Latitude, true),
    formatted("longitude", FieldType::Number, FormatToken::Longitude, true),
];

static ADDRESS: &[FieldDef] = &[
    field("address_1", FieldType::String, true),
    field("city", FieldType::String, true),
    formatted("state_province", FieldType::String, FormatToken::Iso3361, true),
    field("postal_code", FieldType::String, true),
    field("country", FieldType::String, true),
];

static PHONE: &[FieldDef] = &[
    field("number", FieldType::String, true),
    formatted(
        "type",
        FieldType::String,
        FormatToken::Enum(&["text", "voice", "fax", "cell", "video", "pager", "textphone"]),
        false,
    ),
];

static SCHEDULE: &[FieldDef] = &[
    formatted("freq", FieldType::String, FormatToken::Enum(&["WEEKLY", "MONTHLY"]), true),
    field("interval", FieldType::Integer, false),
    formatted(
        "wkst",
        FieldType::String,
        FormatToken::Enum(&["MO", "TU", "WE", "TH", "FR", "SA", "SU"]),
        false,
    ),
    formatted("opens_at", FieldType::String, FormatToken::TimeOfDay, false),
    formatted("closes_at", FieldType::String, FormatToken::TimeOfDay, false),
];

static LANGUAGE: &[FieldDef] = &[formatted("language", FieldType::String, FormatToken::Iso639, true)];

static ACCESSIBILITY: &[FieldDef] = &[field("description", FieldType::String, false)];

static ORGANIZATION_IDENTIFIER: &[FieldDef] = &[
    field("identifier_scheme", FieldType::String, false),
    field("identifier", FieldType::String, true),
];

static METADATA: &[FieldDef] = &[
    field("resource_id", FieldType::String, true),
    field("resource_type", FieldType::String, true),
    field("last_action_type", FieldType::String, true),
    field("last_action_date", FieldType::String, true),
];

static SERVICE_AT_LOCATION: &[FieldDef] = &[
    field("service_id", FieldType::String, true),
    field("location_id", FieldType::String, true),
];
