use pirate_reconciler::Reconciler;
use serde_json::json;
use sqlx::PgPool;

fn sample_payload() -> serde_json::Value {
    json!({
        "organization": [{"id": "o1", "name": "St. Mary's Food Bank"}],
        "service": [{"id": "s1", "name": "Pantry", "status": "active", "organization_id": "o1"}],
        "location": [{"id": "l1", "latitude": 40.7128, "longitude": -74.0060}],
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn reconciling_new_payload_creates_canonical_rows(pool: PgPool) {
    let reconciler = Reconciler::new(pool);
    let outcome = reconciler.reconcile("food_bank_x", &sample_payload()).await.unwrap();

    assert_eq!(outcome.organizations_created, 1);
    assert_eq!(outcome.locations_created, 1);
    assert_eq!(outcome.services_created, 1);
    assert_eq!(outcome.versions_written, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn reconciling_the_same_payload_twice_is_idempotent_for_canonical_versions(pool: PgPool) {
    let reconciler = Reconciler::new(pool);
    let payload = sample_payload();

    let first = reconciler.reconcile("food_bank_x", &payload).await.unwrap();
    let second = reconciler.reconcile("food_bank_x", &payload).await.unwrap();

    assert_eq!(first.organizations_created, 1);
    assert_eq!(second.organizations_created, 0);
    assert_eq!(second.organizations_matched, 1);
    assert_eq!(second.locations_matched, 1);
    assert_eq!(second.versions_written, 0, "no field changed, so no new version rows");
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_coordinates_are_accepted_with_null_location(pool: PgPool) {
    let reconciler = Reconciler::new(pool);
    let payload = json!({
        "organization": [],
        "service": [],
        "location": [{"id": "l1", "latitude": 0.0, "longitude": 0.0}],
    });

    let outcome = reconciler.reconcile("food_bank_x", &payload).await.unwrap();
    assert_eq!(outcome.locations_geocode_missing, 1);
    assert_eq!(outcome.locations_created, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn location_name_conflict_merges_by_majority_then_longest(pool: PgPool) {
    let reconciler = Reconciler::new(pool.clone());

    let first = json!({
        "organization": [],
        "service": [],
        "location": [{"id": "l1", "name": "St. Mary's Food Bank", "latitude": 40.7128, "longitude": -74.0060}],
    });
    let second = json!({
        "organization": [],
        "service": [],
        "location": [{"id": "l1", "name": "Saint Mary Food Pantry", "latitude": 40.7128, "longitude": -74.0060}],
    });

    reconciler.reconcile("food_bank_a", &first).await.unwrap();
    let outcome = reconciler.reconcile("food_bank_b", &second).await.unwrap();

    assert_eq!(outcome.locations_matched, 1);
    assert_eq!(outcome.locations_created, 0);
    assert_eq!(outcome.versions_written, 1, "the name change produces a new location version");

    let row = sqlx::query("select name from location").fetch_one(&pool).await.unwrap();
    let name: String = sqlx::Row::get(&row, "name");
    assert_eq!(name, "Saint Mary Food Pantry", "tied 1-1 on majority, broken by longest");
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_payload_is_a_schema_violation(pool: PgPool) {
    let reconciler = Reconciler::new(pool);
    let err = reconciler
        .reconcile("food_bank_x", &json!({"organization": "not-an-array"}))
        .await
        .unwrap_err();

    let pirate_err = pirate_core::errors::PirateError::normalize(err);
    assert_eq!(pirate_err.kind, pirate_core::errors::ErrorKind::SchemaViolation);
}
