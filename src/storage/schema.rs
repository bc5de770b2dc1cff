//! Database schema and migrations
//!
//! Migrations are applied in order. Each one runs in its own transaction and
//! bumps the recorded version, so a crash between two migrations leaves the
//! database at a consistent, known version.

use crate::storage::traits::{StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Ordered schema upgrades; the index is the migration's version number
const MIGRATIONS: &[&str] = &[
    // 0: base tables
    r#"
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id TEXT NOT NULL UNIQUE,
    source_url TEXT NOT NULL,
    property_type TEXT NOT NULL,
    street TEXT NOT NULL DEFAULT '',
    number TEXT NOT NULL DEFAULT '',
    neighborhood TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    zip_code TEXT NOT NULL DEFAULT '',
    sale_price REAL NOT NULL DEFAULT 0,
    condo_fee REAL NOT NULL DEFAULT 0,
    iptu REAL NOT NULL DEFAULT 0,
    area_m2 REAL NOT NULL DEFAULT 0,
    bedrooms INTEGER NOT NULL DEFAULT 0,
    bathrooms INTEGER NOT NULL DEFAULT 0,
    parking_spaces INTEGER NOT NULL DEFAULT 0,
    latitude REAL,
    longitude REAL,
    images TEXT NOT NULL DEFAULT '[]',
    amenities TEXT NOT NULL DEFAULT '[]',
    description TEXT NOT NULL DEFAULT '',
    building_amenities TEXT NOT NULL DEFAULT '[]',
    unit_amenities TEXT NOT NULL DEFAULT '[]',
    floor_number INTEGER,
    total_floors INTEGER,
    year_built INTEGER,
    furnished TEXT NOT NULL DEFAULT 'unknown',
    pet_friendly INTEGER,
    content_hash TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS execution_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    items_processed INTEGER NOT NULL DEFAULT 0,
    items_created INTEGER NOT NULL DEFAULT 0,
    items_failed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

CREATE TABLE IF NOT EXISTS step_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES execution_runs(id),
    step_name TEXT NOT NULL,
    status TEXT NOT NULL,
    items_processed INTEGER NOT NULL DEFAULT 0,
    items_created INTEGER NOT NULL DEFAULT 0,
    items_failed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);
"#,
    // 1: lookup indexes
    r#"
CREATE INDEX IF NOT EXISTS idx_listings_status ON listings(status);
CREATE INDEX IF NOT EXISTS idx_listings_content_hash ON listings(content_hash);
CREATE INDEX IF NOT EXISTS idx_step_records_run ON step_records(run_id);
"#,
];

/// Version the database will be at once every migration is applied
pub fn latest_schema_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Version recorded in the database; 0 when nothing has been applied
pub fn current_schema_version(conn: &Connection) -> StorageResult<u32> {
    ensure_version_table(conn)?;
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Applies every migration newer than the recorded version
///
/// Each migration runs in its own transaction together with its
/// `schema_version` row.
///
/// # Arguments
///
/// * `conn` - Open connection to the listing database
///
/// # Returns
///
/// * `Ok(())` - Schema is at `latest_schema_version()`
/// * `Err(StorageError::Migration)` - The first migration that failed and its version
pub fn initialize_schema(conn: &mut Connection) -> StorageResult<()> {
    let current = current_schema_version(conn)?;

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = index as u32 + 1;
        apply_migration(conn, version, sql)
            .map_err(|source| StorageError::Migration { version, source })?;
        tracing::debug!("Applied schema migration {}", version);
    }

    Ok(())
}

fn ensure_version_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn apply_migration(conn: &mut Connection, version: u32, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}
