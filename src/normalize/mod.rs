//! Listing normalizer
//!
//! Pure functions that turn search and detail payloads into the canonical
//! `Listing` shape.

pub mod detail;
pub mod lookup;
pub mod search;

pub use detail::{parse_detail_payload, DetailPatch};
pub use search::{parse_search_response, parse_ssr_page};

use scraper::{Html, Selector};

/// Returns the text of the page's embedded `__NEXT_DATA__` JSON document
pub fn extract_next_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script#__NEXT_DATA__").ok()?;
    let script = document.select(&selector).next()?;
    let text: String = script.text().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
