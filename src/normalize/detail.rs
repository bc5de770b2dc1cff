//! Detail payload normalization and merge rules
//!
//! A detail payload is parsed into a `DetailPatch` whose fields are `Some`
//! only when the payload actually carried a usable value. Applying the patch
//! never replaces a known value with an absent or zero one.

use super::lookup::{
    as_bool, first, first_amount, first_bool, first_f64, first_i64, first_string, lookup,
};
use crate::listing::{Coordinates, FurnishedStatus, Listing, PetFriendly};
use crate::Result;
use serde_json::Value;
use tracing::warn;

/// Paths under which the listing object has lived across page revisions
const HOUSE_ROOTS: &[&str] = &[
    "props.pageProps.initialState.house.houseInfo",
    "props.pageProps.house",
    "props.pageProps.listing",
];

/// Address sub-fields present in a structured address block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressPatch {
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Values extracted from one detail payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPatch {
    pub description: Option<String>,
    pub building_amenities: Option<Vec<String>>,
    pub unit_amenities: Option<Vec<String>>,
    pub floor_number: Option<i32>,
    pub total_floors: Option<i32>,
    pub year_built: Option<i32>,
    pub furnished: Option<FurnishedStatus>,
    pub pet_friendly: Option<PetFriendly>,
    pub address: Option<AddressPatch>,
    pub coordinates: Option<Coordinates>,
    pub sale_price: Option<f64>,
    pub condo_fee: Option<f64>,
    pub iptu: Option<f64>,
    pub photos: Option<Vec<String>>,
}

impl DetailPatch {
    /// Merges this patch into `listing` with enrich-if-present semantics
    pub fn apply(&self, listing: &mut Listing) {
        if let Some(description) = &self.description {
            listing.description = description.clone();
        }
        if let Some(items) = &self.building_amenities {
            listing.building_amenities = items.clone();
        }
        if let Some(items) = &self.unit_amenities {
            listing.unit_amenities = items.clone();
        }
        if self.floor_number.is_some() {
            listing.floor_number = self.floor_number;
        }
        if self.total_floors.is_some() {
            listing.total_floors = self.total_floors;
        }
        if self.year_built.is_some() {
            listing.year_built = self.year_built;
        }
        if let Some(furnished) = self.furnished {
            listing.furnished = furnished;
        }
        if let Some(pets) = self.pet_friendly {
            listing.pet_friendly = pets;
        }

        if let Some(address) = &self.address {
            let current = &mut listing.address;
            let merge = |new: &Option<String>, old: &mut String| {
                if let Some(value) = new {
                    *old = value.clone();
                }
            };
            merge(&address.street, &mut current.street);
            merge(&address.number, &mut current.number);
            merge(&address.neighborhood, &mut current.neighborhood);
            merge(&address.city, &mut current.city);
            merge(&address.state, &mut current.state);
            merge(&address.zip_code, &mut current.zip_code);
        }
        if self.coordinates.is_some() {
            listing.coordinates = self.coordinates;
        }

        if let Some(value) = self.sale_price {
            listing.price.sale_price = value;
        }
        if let Some(value) = self.condo_fee {
            listing.price.condo_fee = value;
        }
        if let Some(value) = self.iptu {
            listing.price.iptu = value;
        }

        if let Some(photos) = &self.photos {
            listing.images = photos.clone();
        }
    }
}

/// Parses a raw detail payload
///
/// Malformed JSON is an error. A well-formed document without a listing
/// object yields an empty patch.
pub fn parse_detail_payload(raw: &str, photo_base_url: &str) -> Result<DetailPatch> {
    let document: Value = serde_json::from_str(raw)?;

    match first(&document, HOUSE_ROOTS) {
        Some(house) if house.is_object() => Ok(parse_house_detail(house, photo_base_url)),
        _ => {
            warn!("Detail payload has no listing object");
            Ok(DetailPatch::default())
        }
    }
}

/// Extracts a patch from the listing object of a detail payload
pub fn parse_house_detail(house: &Value, photo_base_url: &str) -> DetailPatch {
    let unit_amenities: Vec<String> = ["comfortCommodities", "practicalityCommodities"]
        .iter()
        .flat_map(|key| flagged_items(lookup(house, key)))
        .collect();

    DetailPatch {
        description: first_string(house, &["remarks", "description"]),
        building_amenities: non_empty(flagged_items(first(house, &["installations"]))),
        unit_amenities: non_empty(unit_amenities),
        floor_number: to_i32(first_i64(house, &["floorNumber", "rangeFloor.min", "floor"])),
        total_floors: to_i32(first_i64(house, &["totalFloors", "buildingFloors", "floors"])),
        year_built: to_i32(first_i64(house, &["constructionYear", "yearBuilt"])),
        furnished: parse_furnished(first(house, &["hasFurniture", "furnished", "furniture"])),
        pet_friendly: first_bool(house, &["acceptsPets", "petFriendly", "pets"])
            .map(PetFriendly::from),
        address: first(house, &["address"])
            .filter(|block| block.is_object())
            .map(parse_address),
        coordinates: parse_coordinates(house),
        sale_price: positive(first_amount(house, &["salePrice", "price.sale"])),
        condo_fee: positive(first_amount(house, &["condoPrice", "condoFee", "condominiumFee"])),
        iptu: positive(first_amount(house, &["iptu", "iptuPrice"])),
        photos: non_empty(photo_urls(first(house, &["photos", "images"]), photo_base_url)),
    }
}

/// Joins a relative photo path onto the photo base; absolute URLs pass through
pub fn absolutize_photo(path: &str, photo_base_url: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        photo_base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_address(block: &Value) -> AddressPatch {
    AddressPatch {
        street: first_string(block, &["street", "streetName"]),
        number: first_string(block, &["number", "streetNumber"]),
        neighborhood: first_string(block, &["neighborhood", "neighbourhood", "regionName"]),
        city: first_string(block, &["city"]),
        state: first_string(block, &["stateAcronym", "state"]),
        zip_code: first_string(block, &["zipCode", "cep", "zip"]),
    }
}

/// Both components must be numeric, non-zero and within ±90 / ±180
fn parse_coordinates(house: &Value) -> Option<Coordinates> {
    let lat = first_f64(house, &["address.lat", "address.latitude", "location.lat"])?;
    let lng = first_f64(
        house,
        &["address.lng", "address.longitude", "location.lng", "location.lon"],
    )?;
    Coordinates::checked(lat, lng)
}

fn parse_furnished(value: Option<&Value>) -> Option<FurnishedStatus> {
    let value = value?;
    if let Value::String(s) = value {
        if s.to_lowercase().contains("semi") {
            return Some(FurnishedStatus::SemiFurnished);
        }
    }
    as_bool(value).map(|furnished| {
        if furnished {
            FurnishedStatus::Furnished
        } else {
            FurnishedStatus::Unfurnished
        }
    })
}

/// Names of items flagged as present
///
/// Items are either plain strings or `{key, text, value}` objects whose
/// `value` reads as true (`"SIM"`, `true`).
fn flagged_items(list: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = list else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) if !name.trim().is_empty() => Some(name.clone()),
            Value::Object(_) => {
                let present = lookup(item, "value").and_then(as_bool).unwrap_or(false);
                if present {
                    first_string(item, &["text", "key", "name"])
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect()
}

fn photo_urls(list: Option<&Value>, photo_base_url: &str) -> Vec<String> {
    let Some(Value::Array(items)) = list else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(path) => Some(path.clone()),
            Value::Object(_) => first_string(item, &["url", "src"]),
            _ => None,
        })
        .filter(|path| !path.trim().is_empty())
        .map(|path| absolutize_photo(path.trim(), photo_base_url))
        .collect()
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0 && v.is_finite())
}

fn to_i32(value: Option<i64>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}
