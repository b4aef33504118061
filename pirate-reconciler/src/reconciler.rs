//! Per-job reconciliation: one aligned payload, one database transaction.
//! Organizations match by exact normalized name; locations match by
//! rounded-coordinate key with a description/recency tie-break; services
//! never dedup across sources in v1.

use std::collections::HashMap;
use std::time::Duration;

use pirate_core::errors::{ErrorKind, PirateError, PirateResult};
use pirate_core::geo::{self, Coordinate};
use pirate_queue::{JobPayload, PirateQueue};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::matcher::{location_match_key, normalize_org_name, pick_match};
use crate::merge::{DefaultMergePolicy, MergePolicy, SourceValue};
use crate::outcome::ReconcileOutcome;
use crate::payload::{normalize_phone, AlignedPayload};
use crate::store;

pub struct Reconciler<M: MergePolicy = DefaultMergePolicy> {
    pool: PgPool,
    merge_policy: M,
}

impl Reconciler<DefaultMergePolicy> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, merge_policy: DefaultMergePolicy }
    }
}

impl<M: MergePolicy> Reconciler<M> {
    pub fn with_merge_policy(pool: PgPool, merge_policy: M) -> Self {
        Self { pool, merge_policy }
    }

    /// Reconcile one aligned job's HSDS candidate. `scraper_id` is the
    /// contributing source, carried onto every `organization_source` /
    /// `location_source` / `service_source` / `record_version` row this
    /// call writes.
    pub async fn reconcile(&self, scraper_id: &str, hsds_candidate: &serde_json::Value) -> PirateResult<ReconcileOutcome> {
        let payload: AlignedPayload = serde_json::from_value(hsds_candidate.clone())
            .map_err(|e| PirateError::schema_violation(format!("aligned payload did not match the HSDS shape: {e}")).into_anyhow())?;

        let mut outcome = ReconcileOutcome::default();
        let mut tx = self.pool.begin().await.map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

        let mut org_ids: HashMap<String, Uuid> = HashMap::new();

        for org in &payload.organization {
            let normalized = normalize_org_name(&org.name);
            let existing = store::find_organization_id(&mut tx, &normalized)
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

            let canonical_id = match existing {
                Some(id) => {
                    outcome.organizations_matched += 1;
                    let (current_name, current_description) = store::get_organization(&mut tx, id)
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

                    let merged_name = self.merge_policy.merge_name(&[
                        SourceValue { value: current_name.clone(), updated_at: chrono::Utc::now() - chrono::Duration::seconds(1) },
                        SourceValue { value: org.name.clone(), updated_at: chrono::Utc::now() },
                    ]);
                    let merged_description = org
                        .description
                        .as_ref()
                        .or(current_description.as_ref())
                        .map(|d| {
                            self.merge_policy
                                .merge_description(&[SourceValue { value: d.clone(), updated_at: chrono::Utc::now() }])
                                .unwrap_or_default()
                        });

                    if merged_name != current_name || merged_description != current_description {
                        store::update_organization_fields(&mut tx, id, &merged_name, merged_description.as_deref())
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                        store::insert_next_version(&mut tx, id, "organization", scraper_id)
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                        outcome.versions_written += 1;
                    }
                    id
                }
                None => {
                    let id = Uuid::new_v4();
                    store::insert_organization(&mut tx, id, &org.name, org.description.as_deref())
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    store::insert_next_version(&mut tx, id, "organization", scraper_id)
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    outcome.organizations_created += 1;
                    outcome.versions_written += 1;
                    id
                }
            };

            store::upsert_organization_source(&mut tx, canonical_id, scraper_id, &org.id, chrono::Utc::now())
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

            for phone in &org.phone {
                store::insert_phone_if_new(&mut tx, "organization", canonical_id, &normalize_phone(&phone.number), phone.phone_type.as_deref())
                    .await
                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            }

            org_ids.insert(org.id.clone(), canonical_id);
        }

        let mut location_ids: HashMap<String, Uuid> = HashMap::new();

        for loc in &payload.location {
            match geo::clamp(loc.latitude, loc.longitude) {
                Coordinate::Missing => {
                    warn!(location_id = %loc.id, "location has no usable coordinates, skipping match");
                    outcome.locations_geocode_missing += 1;
                    let id = Uuid::new_v4();
                    store::insert_location(&mut tx, id, loc.name.as_deref(), loc.description.as_deref(), None, None)
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    store::insert_next_version(&mut tx, id, "location", scraper_id)
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    outcome.locations_created += 1;
                    outcome.versions_written += 1;
                    location_ids.insert(loc.id.clone(), id);
                    continue;
                }
                Coordinate::Valid { lat, lng } => {
                    let (lat_key, lng_key) = location_match_key(lat, lng);
                    let candidates = store::find_location_candidates(&mut tx, lat_key, lng_key)
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

                    let canonical_id = match pick_match(candidates) {
                        Some((id, ambiguous)) => {
                            if ambiguous {
                                outcome.locations_ambiguous += 1;
                            }
                            outcome.locations_matched += 1;

                            let (current_name, current_description, current_lat, current_lng) = store::get_location(&mut tx, id)
                                .await
                                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

                            let mut name_candidates = Vec::new();
                            if let Some(name) = current_name.clone() {
                                name_candidates.push(SourceValue { value: name, updated_at: chrono::Utc::now() - chrono::Duration::seconds(1) });
                            }
                            if let Some(name) = loc.name.clone() {
                                name_candidates.push(SourceValue { value: name, updated_at: loc.updated_at });
                            }
                            let merged_name =
                                if name_candidates.is_empty() { None } else { Some(self.merge_policy.merge_name(&name_candidates)) };

                            let merged_description = loc
                                .description
                                .as_ref()
                                .or(current_description.as_ref())
                                .map(|d| {
                                    self.merge_policy
                                        .merge_description(&[SourceValue { value: d.clone(), updated_at: loc.updated_at }])
                                        .unwrap_or_default()
                                });
                            let merged_lat = self
                                .merge_policy
                                .merge_coordinate(&[SourceValue { value: lat, updated_at: loc.updated_at }])
                                .or(current_lat);
                            let merged_lng = self
                                .merge_policy
                                .merge_coordinate(&[SourceValue { value: lng, updated_at: loc.updated_at }])
                                .or(current_lng);

                            if merged_name != current_name || merged_description != current_description || merged_lat != current_lat || merged_lng != current_lng {
                                store::update_location_fields(&mut tx, id, merged_name.as_deref(), merged_description.as_deref(), merged_lat, merged_lng)
                                    .await
                                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                                store::insert_next_version(&mut tx, id, "location", scraper_id)
                                    .await
                                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                                outcome.versions_written += 1;
                            }
                            id
                        }
                        None => {
                            let id = Uuid::new_v4();
                            store::insert_location(&mut tx, id, loc.name.as_deref(), loc.description.as_deref(), Some(lat), Some(lng))
                                .await
                                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                            store::insert_next_version(&mut tx, id, "location", scraper_id)
                                .await
                                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                            outcome.locations_created += 1;
                            outcome.versions_written += 1;
                            id
                        }
                    };

                    store::upsert_location_source(&mut tx, canonical_id, scraper_id, loc.updated_at)
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

                    for address in &loc.address {
                        store::insert_address_if_new(&mut tx, canonical_id, address)
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    }
                    for phone in &loc.phone {
                        store::insert_phone_if_new(&mut tx, "location", canonical_id, &normalize_phone(&phone.number), phone.phone_type.as_deref())
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    }
                    for sched in &loc.schedule {
                        store::insert_schedule(&mut tx, "location", canonical_id, sched.freq.as_deref(), sched.opens_at.as_deref(), sched.closes_at.as_deref())
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    }

                    location_ids.insert(loc.id.clone(), canonical_id);
                }
            }
        }

        for svc in &payload.service {
            let organization_id = svc.organization_id.as_ref().and_then(|oid| org_ids.get(oid)).copied();
            let id = Uuid::new_v4();

            store::insert_service(&mut tx, id, &svc.name, &svc.status, svc.description.as_deref(), organization_id)
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            store::upsert_service_source(&mut tx, id, scraper_id, chrono::Utc::now())
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            store::insert_next_version(&mut tx, id, "service", scraper_id)
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            outcome.services_created += 1;
            outcome.versions_written += 1;

            for sal in &svc.service_at_location {
                let Some(&location_id) = location_ids.get(&sal.location_id) else {
                    warn!(service_id = %svc.id, location_id = %sal.location_id, "service referenced an unknown location, skipping link");
                    continue;
                };

                let link_id = store::insert_service_at_location(&mut tx, id, location_id)
                    .await
                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                outcome.service_at_location_created += 1;

                for sched in &sal.schedule {
                    store::insert_schedule(&mut tx, "service_at_location", link_id, sched.freq.as_deref(), sched.opens_at.as_deref(), sched.closes_at.as_deref())
                        .await
                        .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                }
            }
        }

        tx.commit().await.map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

        info!(
            scraper_id,
            organizations_created = outcome.organizations_created,
            locations_created = outcome.locations_created,
            services_created = outcome.services_created,
            "aligned payload reconciled"
        );

        Ok(outcome)
    }

    /// Reserve and process one job off the `aligned` queue. A malformed
    /// payload dead-letters as `SchemaViolation`; any database failure is
    /// left to the queue's own retry policy since the transaction already
    /// rolled back whatever it touched.
    pub async fn run_once(&self, queue: &PirateQueue, lease_for: Duration) -> PirateResult<bool> {
        let Some(leased) = queue
            .reserve("aligned", lease_for)
            .await
            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?
        else {
            return Ok(false);
        };

        let JobPayload::Aligned(job) = leased.payload().clone() else {
            queue
                .fail(leased.job_id(), &leased.lease_token, "aligned queue job did not carry an AlignedJob payload".to_string())
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            return Ok(true);
        };

        match self.reconcile(&job.source_id, &job.hsds_candidate).await {
            Ok(_) => {
                queue
                    .complete(leased.job_id(), &leased.lease_token)
                    .await
                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            }
            Err(err) => {
                let pirate_err = PirateError::normalize(err);
                match pirate_err.kind {
                    ErrorKind::SchemaViolation => {
                        queue
                            .fail(leased.job_id(), &leased.lease_token, pirate_err.message.clone())
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    }
                    _ => {
                        queue
                            .defer_with_backoff(&leased, pirate_err.message.clone())
                            .await
                            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
                    }
                }
            }
        }

        Ok(true)
    }
}
