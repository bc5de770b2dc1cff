//! JSON and CSV export of enriched listings

use crate::listing::Listing;
use crate::{CrawlError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flattened listing as written to export files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub source_id: String,
    pub source_url: String,
    pub property_type: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub sale_price: f64,
    pub condo_fee: f64,
    pub iptu: f64,
    pub area_m2: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking_spaces: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub images: Vec<String>,
    pub amenities: Vec<String>,
    pub building_amenities: Vec<String>,
    pub unit_amenities: Vec<String>,
    pub floor_number: Option<i32>,
    pub total_floors: Option<i32>,
    pub year_built: Option<i32>,
    pub furnished: String,
    pub pet_friendly: Option<bool>,
    pub content_hash: Option<String>,
    pub status: String,
    pub updated_at: String,
}

impl From<&Listing> for ExportRecord {
    fn from(listing: &Listing) -> Self {
        Self {
            source_id: listing.source_id.clone(),
            source_url: listing.source_url.clone(),
            property_type: listing.property_type.to_db_string().to_string(),
            street: listing.address.street.clone(),
            number: listing.address.number.clone(),
            neighborhood: listing.address.neighborhood.clone(),
            city: listing.address.city.clone(),
            state: listing.address.state.clone(),
            zip_code: listing.address.zip_code.clone(),
            sale_price: listing.price.sale_price,
            condo_fee: listing.price.condo_fee,
            iptu: listing.price.iptu,
            area_m2: listing.area_m2,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            parking_spaces: listing.parking_spaces,
            latitude: listing.coordinates.map(|c| c.latitude),
            longitude: listing.coordinates.map(|c| c.longitude),
            description: listing.description.clone(),
            images: listing.images.clone(),
            amenities: listing.amenities.clone(),
            building_amenities: listing.building_amenities.clone(),
            unit_amenities: listing.unit_amenities.clone(),
            floor_number: listing.floor_number,
            total_floors: listing.total_floors,
            year_built: listing.year_built,
            furnished: listing.furnished.to_db_string().to_string(),
            pet_friendly: listing.pet_friendly.as_bool(),
            content_hash: listing.content_hash.as_ref().map(|h| h.to_string()),
            status: listing.status.to_db_string().to_string(),
            updated_at: listing.updated_at.to_rfc3339(),
        }
    }
}

/// CSV cannot hold nested sequences, so list columns carry JSON text
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    source_id: &'a str,
    source_url: &'a str,
    property_type: &'a str,
    street: &'a str,
    number: &'a str,
    neighborhood: &'a str,
    city: &'a str,
    state: &'a str,
    zip_code: &'a str,
    sale_price: f64,
    condo_fee: f64,
    iptu: f64,
    area_m2: f64,
    bedrooms: u32,
    bathrooms: u32,
    parking_spaces: u32,
    latitude: Option<f64>,
    longitude: Option<f64>,
    description: &'a str,
    images: String,
    amenities: String,
    building_amenities: String,
    unit_amenities: String,
    floor_number: Option<i32>,
    total_floors: Option<i32>,
    year_built: Option<i32>,
    furnished: &'a str,
    pet_friendly: Option<bool>,
    content_hash: Option<&'a str>,
    status: &'a str,
    updated_at: &'a str,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a ExportRecord) -> Result<Self> {
        Ok(Self {
            source_id: &record.source_id,
            source_url: &record.source_url,
            property_type: &record.property_type,
            street: &record.street,
            number: &record.number,
            neighborhood: &record.neighborhood,
            city: &record.city,
            state: &record.state,
            zip_code: &record.zip_code,
            sale_price: record.sale_price,
            condo_fee: record.condo_fee,
            iptu: record.iptu,
            area_m2: record.area_m2,
            bedrooms: record.bedrooms,
            bathrooms: record.bathrooms,
            parking_spaces: record.parking_spaces,
            latitude: record.latitude,
            longitude: record.longitude,
            description: &record.description,
            images: serde_json::to_string(&record.images)?,
            amenities: serde_json::to_string(&record.amenities)?,
            building_amenities: serde_json::to_string(&record.building_amenities)?,
            unit_amenities: serde_json::to_string(&record.unit_amenities)?,
            floor_number: record.floor_number,
            total_floors: record.total_floors,
            year_built: record.year_built,
            furnished: &record.furnished,
            pet_friendly: record.pet_friendly,
            content_hash: record.content_hash.as_deref(),
            status: &record.status,
            updated_at: &record.updated_at,
        })
    }
}

/// Writes `listings.json` as a pretty-printed array
pub fn write_json(records: &[ExportRecord], path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Writes `listings.csv` with a header row
pub fn write_csv(records: &[ExportRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(CsvRow::from_record(record)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Exports `listings` in every requested format under `output_dir`
///
/// # Arguments
///
/// * `listings` - Records to write
/// * `output_dir` - Created when missing
/// * `formats` - Format names, case-insensitive
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths written, in the order the formats were given
/// * `Err(CrawlError::Export)` - An unknown format name
pub fn export_listings(
    listings: &[Listing],
    output_dir: &Path,
    formats: &[String],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let records: Vec<ExportRecord> = listings.iter().map(ExportRecord::from).collect();

    let mut written = Vec::new();
    for format in formats {
        let path = match format.to_lowercase().as_str() {
            "json" => {
                let path = output_dir.join("listings.json");
                write_json(&records, &path)?;
                path
            }
            "csv" => {
                let path = output_dir.join("listings.csv");
                write_csv(&records, &path)?;
                path
            }
            other => {
                return Err(CrawlError::Export(format!(
                    "unsupported export format '{}'",
                    other
                )))
            }
        };
        info!("Exported {} listings to {}", records.len(), path.display());
        written.push(path);
    }

    Ok(written)
}
