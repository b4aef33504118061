//! `pg_dump`-equivalent snapshotting (ratchet-gated) and a flattened
//! SQLite export of the HSDS tables for downstream consumers who don't
//! want to stand up Postgres.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::{PgPool, Row, SqlitePool};
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ratchet::{Ratchet, RatchetConfig};

pub async fn count_canonical_locations(pool: &PgPool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("select count(*) from location").fetch_one(pool).await?;
    Ok(row.0)
}

/// Run the ratchet check, and when it passes, shell out to `pg_dump` and
/// refresh the `latest.sql` pointer. Returns `None` (no dump written) when
/// the ratchet trips.
pub async fn dump_if_safe(
    database_url: &str,
    pool: &PgPool,
    dumps_dir: &Path,
    config: RatchetConfig,
    timestamp: &str,
) -> Result<Option<PathBuf>> {
    let ratchet_path = dumps_dir.join(".record_count_ratchet");
    let mut ratchet = Ratchet::load(&ratchet_path).await?;
    let count = count_canonical_locations(pool).await?;

    if ratchet.trips(count, config) {
        warn!(count, max_record_count = ratchet.max_record_count, "record count ratchet tripped, skipping SQL dump");
        return Ok(None);
    }

    tokio::fs::create_dir_all(dumps_dir).await?;
    let dump_path = dumps_dir.join(format!("pantry_pirate_radio_{timestamp}.sql"));

    let out = Command::new("pg_dump")
        .arg(database_url)
        .arg("-f")
        .arg(&dump_path)
        .output()
        .await
        .context("run pg_dump")?;

    if !out.status.success() {
        anyhow::bail!("pg_dump failed (code={:?}): {}", out.status.code(), String::from_utf8_lossy(&out.stderr));
    }

    let latest_path = dumps_dir.join("latest.sql");
    let _ = tokio::fs::remove_file(&latest_path).await;
    let dump_file_name = dump_path.file_name().expect("dump path always has a file name");
    #[cfg(unix)]
    std::os::unix::fs::symlink(dump_file_name, &latest_path)?;
    #[cfg(not(unix))]
    tokio::fs::copy(&dump_path, &latest_path).await?;

    ratchet.advance(count, "pirate-publisher");
    ratchet.save(&ratchet_path).await?;

    info!(path = %dump_path.display(), count, "wrote SQL dump");
    Ok(Some(dump_path))
}

/// Five convenience views recreated on every export, so downstream
/// consumers who only want the SQLite file never have to re-derive these
/// joins themselves.
const SQLITE_VIEWS: &str = "
create view if not exists locations_by_scraper as
select l.*, ls.scraper_id
from location l
join location_source ls on ls.location_id = l.id;

create view if not exists multi_source_locations as
select l.*, count(distinct ls.scraper_id) as source_count
from location l
join location_source ls on ls.location_id = l.id
group by l.id
having count(distinct ls.scraper_id) > 1;

create view if not exists service_with_locations as
select s.*, sal.location_id
from service s
join service_at_location sal on sal.service_id = s.id;

create view if not exists location_with_services as
select l.*, sal.service_id
from location l
join service_at_location sal on sal.location_id = l.id;

create view if not exists organization_with_services as
select o.*, s.id as service_id, s.name as service_name, s.status as service_status
from organization o
join service s on s.organization_id = o.id;
";

/// Export `organization`, `location`, `service`, `service_at_location`,
/// `location_source` and the five convenience views into a single SQLite
/// file under `sqlite_dir`.
pub async fn export_sqlite(pg_pool: &PgPool, sqlite_dir: &Path, timestamp: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(sqlite_dir).await?;
    let sqlite_path = sqlite_dir.join(format!("pantry_pirate_radio_{timestamp}.sqlite"));
    let sqlite_url = format!("sqlite://{}?mode=rwc", sqlite_path.display());
    let sqlite_pool = SqlitePool::connect(&sqlite_url).await.context("open sqlite export file")?;

    create_sqlite_schema(&sqlite_pool).await?;
    copy_organizations(pg_pool, &sqlite_pool).await?;
    copy_locations(pg_pool, &sqlite_pool).await?;
    copy_services(pg_pool, &sqlite_pool).await?;
    copy_service_at_location(pg_pool, &sqlite_pool).await?;
    copy_location_source(pg_pool, &sqlite_pool).await?;

    for statement in SQLITE_VIEWS.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(&sqlite_pool).await?;
    }

    sqlite_pool.close().await;
    Ok(sqlite_path)
}

async fn create_sqlite_schema(sqlite_pool: &SqlitePool) -> Result<()> {
    sqlx::query("create table if not exists organization (id text primary key, name text not null, description text)")
        .execute(sqlite_pool)
        .await?;
    sqlx::query(
        "create table if not exists location (id text primary key, name text, description text, latitude real, longitude real)",
    )
    .execute(sqlite_pool)
    .await?;
    sqlx::query("create table if not exists service (id text primary key, name text not null, status text not null, description text, organization_id text)")
        .execute(sqlite_pool)
        .await?;
    sqlx::query("create table if not exists service_at_location (id text primary key, service_id text not null, location_id text not null)")
        .execute(sqlite_pool)
        .await?;
    sqlx::query("create table if not exists location_source (location_id text not null, scraper_id text not null, updated_at text not null, primary key (location_id, scraper_id))")
        .execute(sqlite_pool)
        .await?;
    Ok(())
}

async fn copy_location_source(pg_pool: &PgPool, sqlite_pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("select location_id, scraper_id, updated_at from location_source").fetch_all(pg_pool).await?;
    for row in &rows {
        let (location_id, scraper_id, updated_at): (Uuid, String, chrono::DateTime<chrono::Utc>) =
            (row.get("location_id"), row.get("scraper_id"), row.get("updated_at"));
        sqlx::query("insert or replace into location_source (location_id, scraper_id, updated_at) values (?, ?, ?)")
            .bind(location_id.to_string())
            .bind(scraper_id)
            .bind(updated_at.to_rfc3339())
            .execute(sqlite_pool)
            .await?;
    }
    info!(rows = rows.len(), "exported location_source table to sqlite");
    Ok(())
}

async fn copy_organizations(pg_pool: &PgPool, sqlite_pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("select id, name, description from organization").fetch_all(pg_pool).await?;
    for row in &rows {
        let (id, name, description): (Uuid, String, Option<String>) = (row.get("id"), row.get("name"), row.get("description"));
        sqlx::query("insert or replace into organization (id, name, description) values (?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(description)
            .execute(sqlite_pool)
            .await?;
    }
    info!(rows = rows.len(), "exported organization table to sqlite");
    Ok(())
}

async fn copy_locations(pg_pool: &PgPool, sqlite_pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("select id, name, description, latitude, longitude from location").fetch_all(pg_pool).await?;
    for row in &rows {
        let (id, name, description, lat, lng): (Uuid, Option<String>, Option<String>, Option<f64>, Option<f64>) =
            (row.get("id"), row.get("name"), row.get("description"), row.get("latitude"), row.get("longitude"));
        sqlx::query("insert or replace into location (id, name, description, latitude, longitude) values (?, ?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(description)
            .bind(lat)
            .bind(lng)
            .execute(sqlite_pool)
            .await?;
    }
    info!(rows = rows.len(), "exported location table to sqlite");
    Ok(())
}

async fn copy_services(pg_pool: &PgPool, sqlite_pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("select id, name, status, description, organization_id from service").fetch_all(pg_pool).await?;
    for row in &rows {
        let (id, name, status, description, organization_id): (Uuid, String, String, Option<String>, Option<Uuid>) =
            (row.get("id"), row.get("name"), row.get("status"), row.get("description"), row.get("organization_id"));
        sqlx::query("insert or replace into service (id, name, status, description, organization_id) values (?, ?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(status)
            .bind(description)
            .bind(organization_id.map(|u| u.to_string()))
            .execute(sqlite_pool)
            .await?;
    }
    info!(rows = rows.len(), "exported service table to sqlite");
    Ok(())
}

async fn copy_service_at_location(pg_pool: &PgPool, sqlite_pool: &SqlitePool) -> Result<()> {
    let rows = sqlx::query("select id, service_id, location_id from service_at_location").fetch_all(pg_pool).await?;
    for row in &rows {
        let (id, service_id, location_id): (Uuid, Uuid, Uuid) = (row.get("id"), row.get("service_id"), row.get("location_id"));
        sqlx::query("insert or replace into service_at_location (id, service_id, location_id) values (?, ?, ?)")
            .bind(id.to_string())
            .bind(service_id.to_string())
            .bind(location_id.to_string())
            .execute(sqlite_pool)
            .await?;
    }
    info!(rows = rows.len(), "exported service_at_location table to sqlite");
    Ok(())
}
