//! # pirate-reconciler
//!
//! Consumes the `aligned` queue and merges each payload's organizations,
//! locations and services into canonical entities inside a single database
//! transaction per job, writing an append-only version row for every
//! canonical row the merge actually changes.

pub mod matcher;
pub mod merge;
pub mod outcome;
pub mod payload;
pub mod reconciler;
pub mod store;

pub use matcher::{location_match_key, normalize_org_name};
pub use merge::{DefaultMergePolicy, MergePolicy, SourceValue};
pub use outcome::ReconcileOutcome;
pub use payload::AlignedPayload;
pub use reconciler::Reconciler;
