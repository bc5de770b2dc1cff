//! SQLite storage implementation

use crate::listing::{
    Address, ContentHash, Coordinates, FurnishedStatus, Listing, PetFriendly, PriceInfo,
    PropertyType,
};
use crate::state::{ProcessingStatus, StepStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ExecutionRun, StepRecord};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const LISTING_COLUMNS: &str = "id, source_id, source_url, property_type, street, number, \
     neighborhood, city, state, zip_code, sale_price, condo_fee, iptu, area_m2, bedrooms, \
     bathrooms, parking_spaces, latitude, longitude, images, amenities, description, \
     building_amenities, unit_amenities, floor_number, total_floors, year_built, furnished, \
     pet_friendly, content_hash, status, created_at, updated_at";

const RUN_COLUMNS: &str = "id, mode, status, items_processed, items_created, items_failed, \
     error_message, started_at, finished_at";

const STEP_COLUMNS: &str = "id, run_id, step_name, status, items_processed, items_created, \
     items_failed, error_message, started_at, finished_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file and brings its schema up to date
    ///
    /// A migration failure is returned as an error and must abort the
    /// invocation before any pipeline step runs.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created and migrated database
    /// * `Err(CrawlError)` - Failed to open the file or apply a migration
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        let mut conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&mut conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database, used by dry-run modes and tests
    pub fn open_in_memory() -> Result<Self, CrawlError> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&mut conn)?;
        Ok(Self { conn })
    }

    /// Writes one listing row followed by `on_conflict`
    fn insert_listing_row(
        conn: &Connection,
        listing: &Listing,
        on_conflict: &str,
    ) -> StorageResult<usize> {
        let (latitude, longitude) = match listing.coordinates {
            Some(c) => (Some(c.latitude), Some(c.longitude)),
            None => (None, None),
        };
        let sql = format!(
            "INSERT INTO listings ({}) VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, \
             ?27, ?28, ?29, ?30, ?31, ?32) {}",
            LISTING_COLUMNS, on_conflict
        );

        let changed = conn.execute(
            &sql,
            params![
                listing.source_id,
                listing.source_url,
                listing.property_type.to_db_string(),
                listing.address.street,
                listing.address.number,
                listing.address.neighborhood,
                listing.address.city,
                listing.address.state,
                listing.address.zip_code,
                listing.price.sale_price,
                listing.price.condo_fee,
                listing.price.iptu,
                listing.area_m2,
                listing.bedrooms,
                listing.bathrooms,
                listing.parking_spaces,
                latitude,
                longitude,
                serde_json::to_string(&listing.images)?,
                serde_json::to_string(&listing.amenities)?,
                listing.description,
                serde_json::to_string(&listing.building_amenities)?,
                serde_json::to_string(&listing.unit_amenities)?,
                listing.floor_number,
                listing.total_floors,
                listing.year_built,
                listing.furnished.to_db_string(),
                listing.pet_friendly.to_db_value(),
                listing.content_hash.as_ref().map(|h| h.as_str().to_string()),
                listing.status.to_db_string(),
                listing.created_at,
                listing.updated_at,
            ],
        )?;
        Ok(changed)
    }
}

/// Conflict clause for `upsert_listing`: everything but id and created_at follows the new row
const UPDATE_ON_CONFLICT: &str = "ON CONFLICT(source_id) DO UPDATE SET
    source_url = excluded.source_url,
    property_type = excluded.property_type,
    street = excluded.street,
    number = excluded.number,
    neighborhood = excluded.neighborhood,
    city = excluded.city,
    state = excluded.state,
    zip_code = excluded.zip_code,
    sale_price = excluded.sale_price,
    condo_fee = excluded.condo_fee,
    iptu = excluded.iptu,
    area_m2 = excluded.area_m2,
    bedrooms = excluded.bedrooms,
    bathrooms = excluded.bathrooms,
    parking_spaces = excluded.parking_spaces,
    latitude = excluded.latitude,
    longitude = excluded.longitude,
    images = excluded.images,
    amenities = excluded.amenities,
    description = excluded.description,
    building_amenities = excluded.building_amenities,
    unit_amenities = excluded.unit_amenities,
    floor_number = excluded.floor_number,
    total_floors = excluded.total_floors,
    year_built = excluded.year_built,
    furnished = excluded.furnished,
    pet_friendly = excluded.pet_friendly,
    content_hash = excluded.content_hash,
    status = excluded.status,
    updated_at = excluded.updated_at";

fn parse_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<Listing> {
    let latitude: Option<f64> = row.get(17)?;
    let longitude: Option<f64> = row.get(18)?;

    Ok(Listing {
        id: Some(row.get(0)?),
        source_id: row.get(1)?,
        source_url: row.get(2)?,
        property_type: PropertyType::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(PropertyType::Unknown),
        address: Address {
            street: row.get(4)?,
            number: row.get(5)?,
            neighborhood: row.get(6)?,
            city: row.get(7)?,
            state: row.get(8)?,
            zip_code: row.get(9)?,
        },
        price: PriceInfo {
            sale_price: row.get(10)?,
            condo_fee: row.get(11)?,
            iptu: row.get(12)?,
        },
        area_m2: row.get(13)?,
        bedrooms: row.get(14)?,
        bathrooms: row.get(15)?,
        parking_spaces: row.get(16)?,
        coordinates: latitude
            .zip(longitude)
            .map(|(lat, lng)| Coordinates::new(lat, lng)),
        images: parse_list(&row.get::<_, String>(19)?),
        amenities: parse_list(&row.get::<_, String>(20)?),
        description: row.get(21)?,
        building_amenities: parse_list(&row.get::<_, String>(22)?),
        unit_amenities: parse_list(&row.get::<_, String>(23)?),
        floor_number: row.get(24)?,
        total_floors: row.get(25)?,
        year_built: row.get(26)?,
        furnished: FurnishedStatus::from_db_string(&row.get::<_, String>(27)?)
            .unwrap_or(FurnishedStatus::Unknown),
        pet_friendly: PetFriendly::from_db_value(row.get(28)?),
        content_hash: row.get::<_, Option<String>>(29)?.map(ContentHash::from_hex),
        status: ProcessingStatus::from_db_string(&row.get::<_, String>(30)?)
            .unwrap_or(ProcessingStatus::Pending),
        created_at: row.get(31)?,
        updated_at: row.get(32)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionRun> {
    Ok(ExecutionRun {
        id: row.get(0)?,
        mode: row.get(1)?,
        status: StepStatus::from_db_string(&row.get::<_, String>(2)?)
            .unwrap_or(StepStatus::Failed),
        items_processed: row.get::<_, i64>(3)? as u64,
        items_created: row.get::<_, i64>(4)? as u64,
        items_failed: row.get::<_, i64>(5)? as u64,
        error_message: row.get(6)?,
        started_at: row.get(7)?,
        finished_at: row.get(8)?,
    })
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<StepRecord> {
    Ok(StepRecord {
        id: row.get(0)?,
        run_id: row.get(1)?,
        step_name: row.get(2)?,
        status: StepStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(StepStatus::Failed),
        items_processed: row.get::<_, i64>(4)? as u64,
        items_created: row.get::<_, i64>(5)? as u64,
        items_failed: row.get::<_, i64>(6)? as u64,
        error_message: row.get(7)?,
        started_at: row.get(8)?,
        finished_at: row.get(9)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Listings =====

    fn upsert_listing(&mut self, listing: &Listing) -> StorageResult<Listing> {
        Self::insert_listing_row(&self.conn, listing, UPDATE_ON_CONFLICT)?;

        self.get_by_source_id(&listing.source_id)?.ok_or_else(|| {
            StorageError::Database(format!(
                "listing {} missing after upsert",
                listing.source_id
            ))
        })
    }

    fn upsert_many(&mut self, listings: &[Listing]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut created = 0;
        for listing in listings {
            created += Self::insert_listing_row(&tx, listing, "ON CONFLICT(source_id) DO NOTHING")?;
        }
        tx.commit()?;
        Ok(created)
    }

    fn get_by_status(&self, status: ProcessingStatus) -> StorageResult<Vec<Listing>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM listings WHERE status = ?1 ORDER BY id",
            LISTING_COLUMNS
        ))?;

        let listings = stmt
            .query_map(params![status.to_db_string()], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(listings)
    }

    fn get_by_source_id(&self, source_id: &str) -> StorageResult<Option<Listing>> {
        let listing = self
            .conn
            .query_row(
                &format!("SELECT {} FROM listings WHERE source_id = ?1", LISTING_COLUMNS),
                params![source_id],
                listing_from_row,
            )
            .optional()?;

        Ok(listing)
    }

    fn exists_by_hash(&self, hash: &ContentHash) -> StorageResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM listings WHERE content_hash = ?1 AND status = ?2)",
            params![hash.as_str(), ProcessingStatus::Enriched.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn count_by_status(&self) -> StorageResult<HashMap<ProcessingStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM listings GROUP BY status")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (status, count) in rows {
            if let Some(status) = ProcessingStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run audit =====

    fn create_run(&mut self, mode: &str) -> StorageResult<ExecutionRun> {
        let started_at = Utc::now();
        self.conn.execute(
            "INSERT INTO execution_runs (mode, status, started_at) VALUES (?1, ?2, ?3)",
            params![mode, StepStatus::Running.to_db_string(), started_at],
        )?;

        Ok(ExecutionRun {
            id: self.conn.last_insert_rowid(),
            mode: mode.to_string(),
            status: StepStatus::Running,
            items_processed: 0,
            items_created: 0,
            items_failed: 0,
            error_message: None,
            started_at,
            finished_at: None,
        })
    }

    fn update_run(&mut self, run: &ExecutionRun) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE execution_runs SET status = ?1, items_processed = ?2, items_created = ?3,
             items_failed = ?4, error_message = ?5, finished_at = ?6 WHERE id = ?7",
            params![
                run.status.to_db_string(),
                run.items_processed as i64,
                run.items_created as i64,
                run.items_failed as i64,
                run.error_message,
                run.finished_at,
                run.id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run.id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<ExecutionRun> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM execution_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<ExecutionRun>> {
        let run = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM execution_runs ORDER BY id DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Step audit =====

    fn create_step(&mut self, run_id: i64, step_name: &str) -> StorageResult<StepRecord> {
        let started_at: DateTime<Utc> = Utc::now();
        self.conn
            .execute(
                "INSERT INTO step_records (run_id, step_name, status, started_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    run_id,
                    step_name,
                    StepStatus::Running.to_db_string(),
                    started_at
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StorageError::RunNotFound(run_id)
                }
                other => StorageError::Sqlite(other),
            })?;

        Ok(StepRecord {
            id: self.conn.last_insert_rowid(),
            run_id,
            step_name: step_name.to_string(),
            status: StepStatus::Running,
            items_processed: 0,
            items_created: 0,
            items_failed: 0,
            error_message: None,
            started_at,
            finished_at: None,
        })
    }

    fn update_step(&mut self, step: &StepRecord) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE step_records SET status = ?1, items_processed = ?2, items_created = ?3,
             items_failed = ?4, error_message = ?5, finished_at = ?6 WHERE id = ?7",
            params![
                step.status.to_db_string(),
                step.items_processed as i64,
                step.items_created as i64,
                step.items_failed as i64,
                step.error_message,
                step.finished_at,
                step.id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::StepNotFound(step.id));
        }
        Ok(())
    }

    fn get_steps_for_run(&self, run_id: i64) -> StorageResult<Vec<StepRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM step_records WHERE run_id = ?1 ORDER BY id",
            STEP_COLUMNS
        ))?;

        let steps = stmt
            .query_map(params![run_id], step_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(steps)
    }
}
