//! Prompt assembly for the alignment call: system template, the
//! Draft-07 schema from `pirate-hsds-schema`, the raw scraped content, and
//! the caller's `known_fields` hint.

const SYSTEM_TEMPLATE: &str = "\
You are extracting Human Services Data Specification (HSDS) records from \
a food-assistance provider's raw text. Return JSON matching the schema \
exactly; omit fields you cannot support from the text rather than \
inventing values.";

pub fn assemble(raw_content: &str, schema: &serde_json::Value, known_fields: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(SYSTEM_TEMPLATE);
    prompt.push_str("\n\nSchema:\n");
    prompt.push_str(&schema.to_string());

    if !known_fields.is_empty() {
        prompt.push_str("\n\nFields known to be present in the source: ");
        prompt.push_str(&known_fields.join(", "));
    }

    prompt.push_str("\n\nSource text:\n");
    prompt.push_str(raw_content);
    prompt
}

/// Re-prompt after a low-confidence attempt, appending the validator's
/// feedback text so the next call targets exactly what was missing.
pub fn with_feedback(base_prompt: &str, feedback_text: &str) -> String {
    format!("{base_prompt}\n\nThe previous attempt was incomplete ({feedback_text}). Correct it.")
}

/// Second-pass prompt for the optional validator-LLM hallucination check:
/// asks whether any field in `candidate` was invented rather than read from
/// the source, and for corrections where it was.
pub fn validator_prompt(candidate: &serde_json::Value, known_fields: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Review this HSDS candidate for hallucinated fields: values invented rather than \
         read from the source text. Respond with JSON matching \
         {\"hallucination_detected\": bool, \"mismatched_fields\": [string], \
         \"suggested_corrections\": {\"<entity>[<index>].<field>\": <value>}}.",
    );

    if !known_fields.is_empty() {
        prompt.push_str("\n\nFields known to be present in the source: ");
        prompt.push_str(&known_fields.join(", "));
    }

    prompt.push_str("\n\nCandidate:\n");
    prompt.push_str(&candidate.to_string());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembled_prompt_includes_schema_and_content() {
        let schema = serde_json::json!({"type": "object"});
        let prompt = assemble("Food bank open Tuesdays", &schema, &["service.status".to_string()]);

        assert!(prompt.contains("Food bank open Tuesdays"));
        assert!(prompt.contains("service.status"));
        assert!(prompt.contains("\"type\":\"object\"") || prompt.contains("\"type\": \"object\""));
    }

    #[test]
    fn feedback_prompt_appends_the_missing_fields() {
        let prompt = with_feedback("base", "missing: service[0].status");
        assert!(prompt.starts_with("base"));
        assert!(prompt.contains("missing: service[0].status"));
    }

    #[test]
    fn validator_prompt_includes_the_candidate_and_known_fields() {
        let candidate = serde_json::json!({"organization": []});
        let prompt = validator_prompt(&candidate, &["organization.name".to_string()]);

        assert!(prompt.contains("hallucination_detected"));
        assert!(prompt.contains("organization.name"));
        assert!(prompt.contains("\"organization\":[]") || prompt.contains("\"organization\": []"));
    }
}
