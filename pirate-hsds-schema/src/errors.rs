//! Structured, per-field error accumulation. Kept close to the DogRS
//! `SchemaErrors` shape (a JSON object keyed by field path, each value a
//! list of messages) so the reconciler and the LLM worker can surface
//! schema failures the same way a REST handler would: as a flat bag of
//! `field -> [messages]`.

use serde_json::{Map, Value};

use pirate_core::errors::PirateError;

#[derive(Default, Debug)]
pub struct SchemaErrors {
    map: Map<String, Value>,
}

impl SchemaErrors {
    pub fn push_schema(&mut self, msg: impl Into<String>) {
        Self::push_to(&mut self.map, "_schema", msg);
    }

    pub fn push_field(&mut self, field: &str, msg: impl Into<String>) {
        Self::push_to(&mut self.map, field, msg);
    }

    fn push_to(map: &mut Map<String, Value>, key: &str, msg: impl Into<String>) {
        let msg = Value::String(msg.into());
        match map.get_mut(key) {
            Some(Value::Array(arr)) => arr.push(msg),
            _ => {
                map.insert(key.to_string(), Value::Array(vec![msg]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_schema_violation(self, message: &str) -> anyhow::Error {
        PirateError::schema_violation(message)
            .with_source(anyhow::anyhow!(Value::Object(self.map)))
            .into_anyhow()
    }
}
