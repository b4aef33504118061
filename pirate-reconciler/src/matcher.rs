//! Canonical-entity matching: exact normalized name for organizations,
//! rounded-coordinate key for locations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Case-folded, whitespace-collapsed organization name, the exact-match key
/// for canonical organization dedup.
pub fn normalize_org_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// A location's rounded-coordinate match key (~11m precision), computed
/// with [`pirate_core::geo::round_match_key`].
pub fn location_match_key(lat: f64, lng: f64) -> (i64, i64) {
    (pirate_core::geo::round_match_key(lat), pirate_core::geo::round_match_key(lng))
}

/// A canonical location row in the same match group, as seen from the
/// matcher (only what the tie-break needs).
#[derive(Debug, Clone)]
pub struct LocationCandidate {
    pub id: Uuid,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Tie-break a set of same-key candidates: longest non-empty description
/// first, most recent `updated_at` second. Ambiguity (more than one
/// equally-ranked candidate) is resolved deterministically here rather than
/// surfaced as an error — `MatchAmbiguous` is a counter, not a failure.
pub fn pick_match(mut candidates: Vec<LocationCandidate>) -> Option<(Uuid, bool)> {
    if candidates.is_empty() {
        return None;
    }
    let ambiguous = candidates.len() > 1;

    candidates.sort_by(|a, b| {
        let a_len = a.description.as_deref().unwrap_or("").len();
        let b_len = b.description.as_deref().unwrap_or("").len();
        b_len.cmp(&a_len).then_with(|| b.updated_at.cmp(&a.updated_at))
    });

    Some((candidates[0].id, ambiguous))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_names_fold_case_and_collapse_whitespace() {
        assert_eq!(normalize_org_name("  St.  Mary's   Food Bank "), "st. mary's food bank");
        assert_eq!(normalize_org_name("ST. MARY'S FOOD BANK"), "st. mary's food bank");
    }

    #[test]
    fn match_key_rounds_to_four_decimals() {
        assert_eq!(location_match_key(40.71283, -74.00601), (407128, -740060));
    }

    #[test]
    fn tie_break_prefers_longest_description_then_most_recent() {
        let now = Utc::now();
        let candidates = vec![
            LocationCandidate { id: Uuid::from_u128(1), description: Some("short".into()), updated_at: now },
            LocationCandidate { id: Uuid::from_u128(2), description: Some("a much longer description".into()), updated_at: now },
        ];
        let (winner, ambiguous) = pick_match(candidates).unwrap();
        assert_eq!(winner, Uuid::from_u128(2));
        assert!(ambiguous);
    }

    #[test]
    fn single_candidate_is_not_ambiguous() {
        let now = Utc::now();
        let candidates = vec![LocationCandidate { id: Uuid::from_u128(1), description: None, updated_at: now }];
        let (_, ambiguous) = pick_match(candidates).unwrap();
        assert!(!ambiguous);
    }
}
