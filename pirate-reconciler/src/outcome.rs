/// Tallies from a single `reconcile` call, for the reconciler-matches and
/// record-version metrics.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub organizations_created: u32,
    pub organizations_matched: u32,
    pub locations_created: u32,
    pub locations_matched: u32,
    pub locations_ambiguous: u32,
    pub locations_geocode_missing: u32,
    pub services_created: u32,
    pub service_at_location_created: u32,
    pub versions_written: u32,
}
