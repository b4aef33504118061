//! Converts the field catalogue into a strict JSON Schema (Draft-07), the
//! schema the alignment worker hands the LLM provider as its structured
//! output contract and the reconciler uses to reject malformed candidates
//! before they ever touch a database transaction.

use serde_json::{json, Map, Value};

use crate::fields::{fields_for, FieldDef, FieldType, FormatToken, ENTITIES};

fn format_token_schema(token: FormatToken) -> Value {
    match token {
        FormatToken::Uri => json!({"type": "string", "format": "uri"}),
        FormatToken::Email => json!({"type": "string", "format": "email"}),
        FormatToken::Year => json!({"type": "string", "pattern": r"^\d{4}$"}),
        FormatToken::TimeOfDay => {
            json!({"type": "string", "pattern": r"^([01]\d|2[0-3]):[0-5]\d(Z|[+-]\d{2}:00)$"})
        }
        FormatToken::Iso639 => json!({"type": "string", "pattern": "^[a-z]{2,3}$"}),
        FormatToken::Iso3361 => json!({"type": "string", "pattern": "^[A-Z]{2}$"}),
        FormatToken::CurrencyCode => json!({"type": "string", "pattern": "^[A-Z]{3}$"}),
        FormatToken::Latitude => json!({"type": "number", "minimum": -90, "maximum": 90}),
        FormatToken::Longitude => json!({"type": "number", "minimum": -180, "maximum": 180}),
        FormatToken::Timezone => json!({"type": "number", "minimum": -12, "maximum": 14}),
        FormatToken::Enum(values) => json!({"type": "string", "enum": values}),
    }
}

fn scalar_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "string",
        FieldType::Number => "number",
        FieldType::Integer => "integer",
        FieldType::Boolean => "boolean",
    }
}

fn field_schema(field: &FieldDef) -> Value {
    match field.format {
        Some(token) => format_token_schema(token),
        None => json!({"type": scalar_type_name(field.field_type)}),
    }
}

/// Build the Draft-07 JSON Schema object for a single entity (no nested
/// children embedded — HSDS children are separate arrays in the aligned
/// payload, addressed by the caller's own top-level schema composition).
pub fn entity_schema(entity: &str) -> Option<Value> {
    let fields = fields_for(entity)?;

    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        properties.insert(field.name.to_string(), field_schema(field));
        if field.required {
            required.push(Value::String(field.name.to_string()));
        }
    }

    Some(json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": required,
        "additionalProperties": false,
    }))
}

/// The full aligned-payload schema: an object with one array property per
/// top-level entity (`organization`, `service`, `location`), each item
/// constrained by that entity's schema, plus `$defs` for every child
/// entity so providers can embed children inline under each item.
pub fn aligned_payload_schema() -> Value {
    let mut defs = Map::new();
    for &entity in ENTITIES {
        if let Some(schema) = entity_schema(entity) {
            defs.insert(entity.to_string(), schema);
        }
    }

    let mut properties = Map::new();
    for top_level in ["organization", "service", "location"] {
        properties.insert(
            top_level.to_string(),
            json!({
                "type": "array",
                "items": {"$ref": format!("#/$defs/{top_level}")},
            }),
        );
    }

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "HSDSAlignedPayload",
        "type": "object",
        "properties": Value::Object(properties),
        "required": ["organization", "service", "location"],
        "$defs": Value::Object(defs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_schema_marks_name_required() {
        let schema = entity_schema("organization").unwrap();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "name"));
    }

    #[test]
    fn service_status_is_a_closed_enum() {
        let schema = entity_schema("service").unwrap();
        let status = &schema["properties"]["status"];
        assert_eq!(status["enum"], json!(["active", "inactive", "defunct", "temporarily closed"]));
    }

    #[test]
    fn location_latitude_is_bounded_to_the_full_globe_not_just_the_us_box() {
        let schema = entity_schema("location").unwrap();
        let lat = &schema["properties"]["latitude"];
        assert_eq!(lat["minimum"], json!(-90));
        assert_eq!(lat["maximum"], json!(90));
    }

    #[test]
    fn aligned_payload_schema_has_a_def_for_every_entity() {
        let schema = aligned_payload_schema();
        let defs = schema["$defs"].as_object().unwrap();
        assert_eq!(defs.len(), ENTITIES.len());
    }

    #[test]
    fn unknown_entity_name_returns_none() {
        assert!(entity_schema("widget").is_none());
    }
}
