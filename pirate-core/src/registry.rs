//! Scrapers, LLM providers and geocoders are each looked up by a stable
//! string name rather than hard-coded at compile time, so operators can add
//! a new source or swap a provider without recompiling the orchestrator.
//! [`NamedRegistry`] is the one general-purpose "name -> trait object"
//! registry every closed interface in the pipeline (scraper, provider,
//! geocoder) is built on top of.

use std::collections::HashMap;
use std::sync::Arc;

/// A simple registry mapping stable string names to `Arc<dyn T>`
/// implementations of some closed interface.
pub struct NamedRegistry<T: ?Sized> {
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> NamedRegistry<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn register<S: Into<String>>(&mut self, name: S, value: Arc<T>) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for NamedRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello;
    impl Greeter for Hello {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn register_then_look_up_by_name() {
        let mut registry: NamedRegistry<dyn Greeter> = NamedRegistry::new();
        registry.register("hello", Arc::new(Hello));

        assert_eq!(registry.get("hello").unwrap().greet(), "hello");
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["hello"]);
    }
}
