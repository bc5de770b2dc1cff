//! Search result normalization
//!
//! Two payload shapes carry the same listing summaries: the search API's
//! `hits.hits[]._source` documents and the `initialState.houses` map embedded
//! in server-rendered search pages.

use super::lookup::{
    as_string, first, first_amount, first_f64, first_i64, first_string, parse_amount,
};
use crate::listing::{Coordinates, Listing, PropertyType};
use serde_json::Value;
use tracing::warn;

/// Maps API type codes and Portuguese labels onto `PropertyType`
pub fn parse_property_type(raw: &str) -> PropertyType {
    match raw.trim().to_uppercase().as_str() {
        "APARTMENT" | "APARTAMENTO" | "FLAT" | "COBERTURA" => PropertyType::Apartment,
        "HOUSE" | "CASA" | "SOBRADO" => PropertyType::House,
        "CONDOMINIUM" | "CASA DE CONDOMINIO" | "CASA DE CONDOMÍNIO" | "CASACONDOMINIO" => {
            PropertyType::Condo
        }
        "STUDIO" | "KITNET" | "STUDIO E KITNET" => PropertyType::Studio,
        _ => PropertyType::Unknown,
    }
}

/// Splits a combined `"R$ 800 + R$ 200"` condo/tax string into its two amounts
pub fn split_condo_iptu(raw: &str) -> (f64, f64) {
    let mut parts = raw.split('+').map(|part| parse_amount(part).unwrap_or(0.0));
    let condo = parts.next().unwrap_or(0.0);
    let iptu = parts.next().unwrap_or(0.0);
    (condo, iptu)
}

/// Normalizes one listing summary
///
/// Returns `None` when the document carries no identifier.
pub fn parse_house(house: &Value, detail_base_url: &str) -> Option<Listing> {
    let source_id = first_string(house, &["id", "houseId", "listingId"])?;
    let mut listing = Listing::from_source_id(source_id.trim(), detail_base_url);

    if let Some(raw_type) = first_string(house, &["type", "houseType", "propertyType"]) {
        listing.property_type = parse_property_type(&raw_type);
    }

    let address = &mut listing.address;
    address.street = first_string(house, &["street", "address.street"]).unwrap_or_default();
    address.number =
        first_string(house, &["streetNumber", "address.number"]).unwrap_or_default();
    address.neighborhood = first_string(
        house,
        &["neighbourhood", "neighborhood", "regionName", "address.neighborhood"],
    )
    .unwrap_or_default();
    address.city = first_string(house, &["city", "address.city"]).unwrap_or_default();
    address.state =
        first_string(house, &["state", "stateAcronym", "address.stateAcronym"]).unwrap_or_default();
    address.zip_code = first_string(house, &["zipCode", "cep"]).unwrap_or_default();

    let price = &mut listing.price;
    price.sale_price =
        first_amount(house, &["salePrice", "sale_price", "price"]).unwrap_or(0.0);
    price.condo_fee =
        first_amount(house, &["condoFee", "condo_fee", "condoPrice"]).unwrap_or(0.0);
    price.iptu = first_amount(house, &["iptu", "iptuPrice"]).unwrap_or(0.0);
    if price.condo_fee == 0.0 && price.iptu == 0.0 {
        if let Some(combined) = first_string(house, &["condoIptu", "iptuPlusCondominium"]) {
            let (condo, iptu) = split_condo_iptu(&combined);
            price.condo_fee = condo;
            price.iptu = iptu;
        }
    }

    listing.area_m2 = first_f64(house, &["area", "areaM2", "totalArea"]).unwrap_or(0.0);
    listing.bedrooms = non_negative(first_i64(house, &["bedrooms", "dorms"]));
    listing.bathrooms = non_negative(first_i64(house, &["bathrooms"]));
    listing.parking_spaces =
        non_negative(first_i64(house, &["parkingSpaces", "parkingSpots", "parking"]));

    let latitude = first_f64(house, &["latitude", "location.lat", "address.lat"]);
    let longitude = first_f64(
        house,
        &["longitude", "location.lon", "location.lng", "address.lng"],
    );
    if let (Some(lat), Some(lng)) = (latitude, longitude) {
        listing.coordinates = Coordinates::checked(lat, lng);
    }

    listing.images = string_list(first(house, &["imageList", "images", "photos"]));
    listing.amenities = string_list(first(house, &["amenities"]));

    Some(listing)
}

/// Normalizes the `houses` collection of a server-rendered page
///
/// The collection is usually a map keyed by id but may be an array. Entries
/// that are not objects (page metadata mixed into the map) are skipped.
pub fn parse_ssr_houses(houses: &Value, detail_base_url: &str) -> Vec<Listing> {
    let entries: Vec<&Value> = match houses {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter(|entry| entry.is_object())
        .filter_map(|entry| parse_house(entry, detail_base_url))
        .collect()
}

/// Normalizes an embedded page document into listings and the reported total
pub fn parse_ssr_page(document: &Value, detail_base_url: &str) -> (Vec<Listing>, u64) {
    let Some(initial) = first(document, &["props.pageProps.initialState"]) else {
        warn!("Search page has no initialState");
        return (Vec::new(), 0);
    };

    let listings = first(initial, &["houses"])
        .map(|houses| parse_ssr_houses(houses, detail_base_url))
        .unwrap_or_default();

    let total = first_i64(
        initial,
        &["search.markers.total.value", "search.markers.total"],
    )
    .unwrap_or(0)
    .max(0) as u64;

    (listings, total)
}

/// Normalizes a search API response (`hits.total` and `hits.hits[]._source`)
pub fn parse_search_response(data: &Value, detail_base_url: &str) -> (Vec<Listing>, u64) {
    let total = first_i64(data, &["hits.total.value", "hits.total"])
        .unwrap_or(0)
        .max(0) as u64;

    let listings = match first(data, &["hits.hits"]) {
        Some(Value::Array(hits)) => hits
            .iter()
            .filter_map(|hit| {
                let source = first(hit, &["_source"])?;
                let listing = parse_house(source, detail_base_url);
                if listing.is_none() {
                    warn!(
                        "Skipping search hit without id: {}",
                        first(hit, &["_id"]).and_then(as_string).unwrap_or_default()
                    );
                }
                listing
            })
            .collect(),
        _ => Vec::new(),
    };

    (listings, total)
}

fn non_negative(value: Option<i64>) -> u32 {
    value.unwrap_or(0).clamp(0, u32::MAX as i64) as u32
}

/// Lists of strings or of `{url}` / `{text}` objects flattened to strings
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => first_string(item, &["url", "text", "key", "name"]),
            other => as_string(other),
        })
        .filter(|s| !s.is_empty())
        .collect()
}
