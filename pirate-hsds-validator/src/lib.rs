//! # pirate-hsds-validator
//!
//! Computes a confidence score for an HSDS candidate by walking the field
//! catalogue from `pirate-hsds-schema` and deducting for every required
//! field the candidate is missing. A field the caller asserted was present
//! in the source (`known_fields`) costs more to be missing than one the
//! caller never claimed, on the theory that a known-but-dropped field is a
//! worse sign from the LLM than a field the source simply never had.

use serde_json::Value;

use pirate_hsds_schema::fields::{fields_for, FieldDef};

/// One of the five deduction classes from the confidence-scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    TopLevel,
    Organization,
    Service,
    Location,
    Other,
}

impl FieldClass {
    fn deduction(self, known: bool) -> f64 {
        match (self, known) {
            (FieldClass::TopLevel, false) => 0.15,
            (FieldClass::TopLevel, true) => 0.25,
            (FieldClass::Organization, false) => 0.10,
            (FieldClass::Organization, true) => 0.20,
            (FieldClass::Service, false) => 0.10,
            (FieldClass::Service, true) => 0.20,
            (FieldClass::Location, false) => 0.10,
            (FieldClass::Location, true) => 0.20,
            (FieldClass::Other, false) => 0.05,
            (FieldClass::Other, true) => 0.15,
        }
    }

    fn for_entity(entity: &str) -> FieldClass {
        match entity {
            "organization" => FieldClass::Organization,
            "service" => FieldClass::Service,
            "location" => FieldClass::Location,
            _ => FieldClass::Other,
        }
    }
}

const TOP_LEVEL_ENTITIES: &[&str] = &["organization", "service", "location"];

#[derive(Debug, Clone)]
struct Miss {
    path: String,
    class: FieldClass,
}

/// The result of scoring a candidate: a confidence in `[0,1]`, the list of
/// missing field paths, and human-readable feedback text suitable for
/// appending to a retry prompt.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub confidence: f64,
    pub missing_fields: Vec<String>,
    pub feedback_text: String,
}

/// Score `candidate` against the HSDS field catalogue. `known_fields` is
/// the set of field paths (e.g. `"service.status"`) the caller asserted
/// were present in the raw source, making their absence more costly.
pub fn validate(candidate: &Value, known_fields: &[String]) -> ValidationOutcome {
    let mut misses = Vec::new();

    for &entity in TOP_LEVEL_ENTITIES {
        let items = candidate.get(entity).and_then(Value::as_array);

        match items {
            None => {
                misses.push(Miss { path: entity.to_string(), class: FieldClass::TopLevel });
            }
            Some(items) if items.is_empty() => {
                misses.push(Miss { path: entity.to_string(), class: FieldClass::TopLevel });
            }
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    check_entity_fields(entity, item, idx, &mut misses);
                    check_children(item, idx, &mut misses);
                }
            }
        }
    }

    score(misses, known_fields)
}

fn check_entity_fields(entity: &str, item: &Value, idx: usize, misses: &mut Vec<Miss>) {
    let Some(fields) = fields_for(entity) else { return };
    let class = FieldClass::for_entity(entity);

    for field in fields.iter().filter(|f| f.required) {
        if !has_field(item, field) {
            misses.push(Miss { path: format!("{entity}[{idx}].{}", field.name), class });
        }
    }
}

/// HSDS children (addresses, phones, schedules, ...) are nested arrays
/// under a top-level item when the candidate embeds them inline. Missing
/// required fields on an embedded child fall in the "Other" class.
fn check_children(item: &Value, idx: usize, misses: &mut Vec<Miss>) {
    let Some(obj) = item.as_object() else { return };

    for (key, value) in obj {
        let Some(children) = fields_for(key) else { continue };
        let Some(child_items) = value.as_array() else { continue };

        for (child_idx, child) in child_items.iter().enumerate() {
            for field in children.iter().filter(|f| f.required) {
                if !has_field(child, field) {
                    misses.push(Miss {
                        path: format!("item[{idx}].{key}[{child_idx}].{}", field.name),
                        class: FieldClass::Other,
                    });
                }
            }
        }
    }
}

fn has_field(item: &Value, field: &FieldDef) -> bool {
    match item.get(field.name) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn score(misses: Vec<Miss>, known_fields: &[String]) -> ValidationOutcome {
    let mut confidence = 1.0;
    let mut missing_fields = Vec::with_capacity(misses.len());

    for miss in &misses {
        let known = known_fields.iter().any(|k| miss.path.ends_with(k.as_str()));
        confidence -= miss.class.deduction(known);
        missing_fields.push(miss.path.clone());
    }

    let confidence = confidence.max(0.0);
    let feedback_text = if missing_fields.is_empty() {
        String::new()
    } else {
        format!("missing: {}", missing_fields.join(", "))
    };

    ValidationOutcome { confidence, missing_fields, feedback_text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_candidate() -> Value {
        json!({
            "organization": [{"id": "o1", "name": "St. Mary's Food Bank"}],
            "service": [{"id": "s1", "name": "Pantry", "status": "active"}],
            "location": [{"id": "l1", "latitude": 40.7128, "longitude": -74.0060}],
        })
    }

    #[test]
    fn fully_populated_candidate_scores_one() {
        let outcome = validate(&valid_candidate(), &[]);
        assert_eq!(outcome.confidence, 1.0);
        assert!(outcome.missing_fields.is_empty());
    }

    #[test]
    fn missing_required_service_field_deducts_service_weight() {
        let mut candidate = valid_candidate();
        candidate["service"][0].as_object_mut().unwrap().remove("status");

        let outcome = validate(&candidate, &[]);
        assert!((outcome.confidence - 0.90).abs() < 1e-9);
        assert_eq!(outcome.missing_fields, vec!["service[0].status"]);
    }

    #[test]
    fn missing_known_field_costs_more_than_an_unknown_one() {
        let mut candidate = valid_candidate();
        candidate["service"][0].as_object_mut().unwrap().remove("status");

        let default_outcome = validate(&candidate, &[]);
        let known_outcome = validate(&candidate, &["service.status".to_string()]);

        assert!(known_outcome.confidence < default_outcome.confidence);
    }

    #[test]
    fn missing_top_level_array_deducts_top_level_weight() {
        let mut candidate = valid_candidate();
        candidate.as_object_mut().unwrap().remove("location");

        let outcome = validate(&candidate, &[]);
        assert!((outcome.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn confidence_never_goes_below_zero() {
        let outcome = validate(&json!({}), &[]);
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn feedback_text_lists_missing_fields() {
        let mut candidate = valid_candidate();
        candidate["service"][0].as_object_mut().unwrap().remove("status");

        let outcome = validate(&candidate, &[]);
        assert_eq!(outcome.feedback_text, "missing: service[0].status");
    }
}
