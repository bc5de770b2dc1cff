//! Listing entity and its value objects
//!
//! A `Listing` is keyed by the source site's `source_id`. The surrogate `id`
//! is assigned by the store and never used to decide insert vs update.

mod types;

pub use types::{
    slugify, Address, ContentHash, Coordinates, FurnishedStatus, PetFriendly, PriceInfo,
    PropertyType, SearchCriteria,
};

use crate::state::ProcessingStatus;
use crate::{CrawlError, Result};
use chrono::{DateTime, Utc};

/// A property listing as discovered and later enriched
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: Option<i64>,
    pub source_id: String,
    pub source_url: String,
    pub property_type: PropertyType,
    pub address: Address,
    pub price: PriceInfo,
    pub area_m2: f64,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking_spaces: u32,
    pub coordinates: Option<Coordinates>,
    pub images: Vec<String>,
    pub amenities: Vec<String>,

    // Populated from the detail page only
    pub description: String,
    pub building_amenities: Vec<String>,
    pub unit_amenities: Vec<String>,
    pub floor_number: Option<i32>,
    pub total_floors: Option<i32>,
    pub year_built: Option<i32>,
    pub furnished: FurnishedStatus,
    pub pet_friendly: PetFriendly,

    pub content_hash: Option<ContentHash>,
    pub status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Creates a pending listing with every descriptive field at its default
    pub fn new(source_id: impl Into<String>, source_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            source_id: source_id.into(),
            source_url: source_url.into(),
            property_type: PropertyType::Unknown,
            address: Address::default(),
            price: PriceInfo::default(),
            area_m2: 0.0,
            bedrooms: 0,
            bathrooms: 0,
            parking_spaces: 0,
            coordinates: None,
            images: Vec::new(),
            amenities: Vec::new(),
            description: String::new(),
            building_amenities: Vec::new(),
            unit_amenities: Vec::new(),
            floor_number: None,
            total_floors: None,
            year_built: None,
            furnished: FurnishedStatus::Unknown,
            pet_friendly: PetFriendly::Unknown,
            content_hash: None,
            status: ProcessingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a pending listing whose URL is derived from `detail_base_url`
    pub fn from_source_id(source_id: impl Into<String>, detail_base_url: &str) -> Self {
        let source_id = source_id.into();
        let source_url = detail_url(detail_base_url, &source_id);
        Self::new(source_id, source_url)
    }

    /// Attaches the content hash and moves the listing to `Enriched`
    pub fn mark_enriched(&mut self, content_hash: ContentHash) -> Result<()> {
        self.transition(ProcessingStatus::Enriched)?;
        self.content_hash = Some(content_hash);
        Ok(())
    }

    pub fn mark_duplicate(&mut self) -> Result<()> {
        self.transition(ProcessingStatus::Duplicate)
    }

    pub fn mark_failed(&mut self) -> Result<()> {
        self.transition(ProcessingStatus::Failed)
    }

    fn transition(&mut self, next: ProcessingStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Builds the detail page URL for a listing identifier
pub fn detail_url(detail_base_url: &str, source_id: &str) -> String {
    format!("{}/{}", detail_base_url.trim_end_matches('/'), source_id)
}
