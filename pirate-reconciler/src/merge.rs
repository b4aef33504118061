//! Field-level merge policy, factored out as a pluggable object so a future
//! confidence-weighted merge can replace the default (majority/longest/
//! most-recent) policy without touching the transaction plumbing in
//! [`crate::reconciler`].

use chrono::{DateTime, Utc};

/// One source's contribution to a canonical field, carrying the timestamp
/// needed for the "most recent" and "first non-empty" rules.
#[derive(Debug, Clone)]
pub struct SourceValue<T> {
    pub value: T,
    pub updated_at: DateTime<Utc>,
}

pub trait MergePolicy: Send + Sync {
    /// Majority vote; ties broken by longest string.
    fn merge_name(&self, candidates: &[SourceValue<String>]) -> String;
    /// Longest non-empty value.
    fn merge_description(&self, candidates: &[SourceValue<String>]) -> Option<String>;
    /// Most recently updated source value.
    fn merge_coordinate(&self, candidates: &[SourceValue<f64>]) -> Option<f64>;
    /// First non-empty value by `updated_at` descending.
    fn merge_scalar(&self, candidates: &[SourceValue<String>]) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMergePolicy;

impl MergePolicy for DefaultMergePolicy {
    fn merge_name(&self, candidates: &[SourceValue<String>]) -> String {
        if candidates.is_empty() {
            return String::new();
        }

        let mut counts: Vec<(&str, usize)> = Vec::new();
        for c in candidates {
            if let Some(entry) = counts.iter_mut().find(|(v, _)| *v == c.value.as_str()) {
                entry.1 += 1;
            } else {
                counts.push((c.value.as_str(), 1));
            }
        }

        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.len().cmp(&a.0.len())));
        counts[0].0.to_string()
    }

    fn merge_description(&self, candidates: &[SourceValue<String>]) -> Option<String> {
        candidates
            .iter()
            .filter(|c| !c.value.is_empty())
            .max_by_key(|c| c.value.len())
            .map(|c| c.value.clone())
    }

    fn merge_coordinate(&self, candidates: &[SourceValue<f64>]) -> Option<f64> {
        candidates.iter().max_by_key(|c| c.updated_at).map(|c| c.value)
    }

    fn merge_scalar(&self, candidates: &[SourceValue<String>]) -> Option<String> {
        let mut sorted: Vec<&SourceValue<String>> = candidates.iter().filter(|c| !c.value.is_empty()).collect();
        sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sorted.first().map(|c| c.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(value: &str, secs_ago: i64) -> SourceValue<String> {
        SourceValue { value: value.to_string(), updated_at: Utc::now() - chrono::Duration::seconds(secs_ago) }
    }

    #[test]
    fn name_merge_picks_majority() {
        let policy = DefaultMergePolicy;
        let candidates = vec![sv("Food Bank", 10), sv("Food Bank", 5), sv("Food Bank Inc", 1)];
        assert_eq!(policy.merge_name(&candidates), "Food Bank");
    }

    #[test]
    fn name_merge_breaks_ties_with_longest() {
        let policy = DefaultMergePolicy;
        let candidates = vec![sv("Food Bank", 10), sv("Food Bank Inc", 5)];
        assert_eq!(policy.merge_name(&candidates), "Food Bank Inc");
    }

    #[test]
    fn description_merge_picks_longest_non_empty() {
        let policy = DefaultMergePolicy;
        let candidates = vec![sv("", 1), sv("short", 5), sv("a longer description here", 10)];
        assert_eq!(policy.merge_description(&candidates), Some("a longer description here".to_string()));
    }

    #[test]
    fn scalar_merge_picks_first_non_empty_by_recency() {
        let policy = DefaultMergePolicy;
        let candidates = vec![sv("", 1), sv("older", 10), sv("newer", 2)];
        assert_eq!(policy.merge_scalar(&candidates), Some("newer".to_string()));
    }
}
