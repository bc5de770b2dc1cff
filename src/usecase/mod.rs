//! Business use cases driven by the pipeline steps

pub mod enrich;
pub mod search;
pub mod segmented;

pub use enrich::{EnrichListings, EnrichSummary};
pub use search::{SearchListings, SearchSummary, StopReason};
pub use segmented::SegmentedSearch;
