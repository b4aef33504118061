//! Raw SQL for the reconciler's canonical tables. Every function here takes
//! an open transaction and nothing commits until [`crate::reconciler`]'s
//! caller does — a failing step anywhere rolls the whole aligned payload
//! back, per the spec's single-transaction-per-job rule.
//!
//! Plain `sqlx::query`/`query_as` (not the `query!` macros) so this crate
//! builds without a live database or an offline query cache checked into
//! the repo.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::matcher::LocationCandidate;
use crate::payload::AddressInput;

pub type Tx<'a> = Transaction<'a, Postgres>;

pub async fn find_organization_id(tx: &mut Tx<'_>, normalized_name: &str) -> sqlx::Result<Option<Uuid>> {
    let row = sqlx::query("select id from organization where lower(regexp_replace(name, '\\s+', ' ', 'g')) = $1")
        .bind(normalized_name)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|r| r.get::<Uuid, _>("id")))
}

pub async fn insert_organization(tx: &mut Tx<'_>, id: Uuid, name: &str, description: Option<&str>) -> sqlx::Result<()> {
    sqlx::query("insert into organization (id, name, description) values ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn get_organization(tx: &mut Tx<'_>, id: Uuid) -> sqlx::Result<(String, Option<String>)> {
    let row = sqlx::query("select name, description from organization where id = $1")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    Ok((row.get("name"), row.get("description")))
}

pub async fn update_organization_fields(tx: &mut Tx<'_>, id: Uuid, name: &str, description: Option<&str>) -> sqlx::Result<()> {
    sqlx::query("update organization set name = $2, description = coalesce($3, description) where id = $1")
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn upsert_organization_source(
    tx: &mut Tx<'_>,
    canonical_id: Uuid,
    scraper_id: &str,
    source_external_id: &str,
    updated_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "insert into organization_source (organization_id, scraper_id, source_external_id, updated_at) \
         values ($1, $2, $3, $4) \
         on conflict (organization_id, scraper_id) do update set \
         source_external_id = excluded.source_external_id, updated_at = excluded.updated_at",
    )
    .bind(canonical_id)
    .bind(scraper_id)
    .bind(source_external_id)
    .bind(updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find_location_candidates(tx: &mut Tx<'_>, lat_key: i64, lng_key: i64) -> sqlx::Result<Vec<LocationCandidate>> {
    let rows = sqlx::query(
        "select id, description, updated_at from location where \
         round(latitude * 10000)::bigint = $1 and round(longitude * 10000)::bigint = $2",
    )
    .bind(lat_key)
    .bind(lng_key)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| LocationCandidate {
            id: r.get("id"),
            description: r.get("description"),
            updated_at: r.get("updated_at"),
        })
        .collect())
}

pub async fn insert_location(
    tx: &mut Tx<'_>,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> sqlx::Result<()> {
    sqlx::query(
        "insert into location (id, name, description, latitude, longitude, is_canonical) \
         values ($1, $2, $3, $4, $5, true)",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(lat)
    .bind(lng)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get_location(tx: &mut Tx<'_>, id: Uuid) -> sqlx::Result<(Option<String>, Option<String>, Option<f64>, Option<f64>)> {
    let row = sqlx::query("select name, description, latitude, longitude from location where id = $1")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    Ok((row.get("name"), row.get("description"), row.get("latitude"), row.get("longitude")))
}

pub async fn update_location_fields(
    tx: &mut Tx<'_>,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> sqlx::Result<()> {
    sqlx::query(
        "update location set \
         name = coalesce($2, name), \
         description = coalesce($3, description), \
         latitude = coalesce($4, latitude), \
         longitude = coalesce($5, longitude) \
         where id = $1",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(lat)
    .bind(lng)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn upsert_location_source(tx: &mut Tx<'_>, canonical_id: Uuid, scraper_id: &str, updated_at: DateTime<Utc>) -> sqlx::Result<()> {
    sqlx::query(
        "insert into location_source (location_id, scraper_id, updated_at) values ($1, $2, $3) \
         on conflict (location_id, scraper_id) do update set updated_at = excluded.updated_at",
    )
    .bind(canonical_id)
    .bind(scraper_id)
    .bind(updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_address_if_new(tx: &mut Tx<'_>, location_id: Uuid, address: &AddressInput) -> sqlx::Result<()> {
    sqlx::query(
        "insert into address (location_id, address_1, city, state_province, postal_code, address_type) \
         values ($1, $2, $3, $4, $5, $6) \
         on conflict (location_id, lower(address_1), lower(city), lower(state_province), lower(postal_code)) do nothing",
    )
    .bind(location_id)
    .bind(&address.address_1)
    .bind(&address.city)
    .bind(&address.state_province)
    .bind(&address.postal_code)
    .bind(address.address_type.as_deref())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_phone_if_new(tx: &mut Tx<'_>, owner_type: &str, owner_id: Uuid, digits: &str, phone_type: Option<&str>) -> sqlx::Result<()> {
    sqlx::query(
        "insert into phone (owner_type, owner_id, number_digits, phone_type) values ($1, $2, $3, $4) \
         on conflict (owner_type, owner_id, number_digits) do nothing",
    )
    .bind(owner_type)
    .bind(owner_id)
    .bind(digits)
    .bind(phone_type)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_schedule(tx: &mut Tx<'_>, owner_type: &str, owner_id: Uuid, freq: Option<&str>, opens_at: Option<&str>, closes_at: Option<&str>) -> sqlx::Result<()> {
    sqlx::query("insert into schedule (owner_type, owner_id, freq, opens_at, closes_at) values ($1, $2, $3, $4, $5)")
        .bind(owner_type)
        .bind(owner_id)
        .bind(freq)
        .bind(opens_at)
        .bind(closes_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_service(tx: &mut Tx<'_>, id: Uuid, name: &str, status: &str, description: Option<&str>, organization_id: Option<Uuid>) -> sqlx::Result<()> {
    sqlx::query("insert into service (id, name, status, description, organization_id) values ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(name)
        .bind(status)
        .bind(description)
        .bind(organization_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn upsert_service_source(tx: &mut Tx<'_>, service_id: Uuid, scraper_id: &str, updated_at: DateTime<Utc>) -> sqlx::Result<()> {
    sqlx::query(
        "insert into service_source (service_id, scraper_id, updated_at) values ($1, $2, $3) \
         on conflict (service_id, scraper_id) do update set updated_at = excluded.updated_at",
    )
    .bind(service_id)
    .bind(scraper_id)
    .bind(updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_service_at_location(tx: &mut Tx<'_>, service_id: Uuid, location_id: Uuid) -> sqlx::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("insert into service_at_location (id, service_id, location_id) values ($1, $2, $3)")
        .bind(id)
        .bind(service_id)
        .bind(location_id)
        .execute(&mut **tx)
        .await?;
    Ok(id)
}

/// `insert ... select max(version_num)+1 ... within the same transaction`,
/// per the spec's monotonic-version rule.
pub async fn insert_next_version(tx: &mut Tx<'_>, record_id: Uuid, record_type: &str, source_id: &str) -> sqlx::Result<i64> {
    let row = sqlx::query(
        "insert into record_version (record_id, record_type, version_num, source_id, created_at) \
         select $1, $2, coalesce(max(version_num), 0) + 1, $3, now() \
         from record_version where record_id = $1 and record_type = $2 \
         returning version_num",
    )
    .bind(record_id)
    .bind(record_type)
    .bind(source_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.get("version_num"))
}
