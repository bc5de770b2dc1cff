/// Listing processing states
///
/// A listing is created `Pending` when first discovered and moves exactly once
/// into one of the terminal states when the enrichment pass visits it.
use std::fmt;

/// Represents where a listing stands in the enrichment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStatus {
    /// Discovered by search or bulk collection, not yet enriched
    Pending,

    /// Detail payload merged and content hash attached
    Enriched,

    /// Detail payload was byte-identical to an already enriched listing
    Duplicate,

    /// Detail fetch or merge failed
    Failed,
}

impl ProcessingStatus {
    /// Returns true if no further processing happens for this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`
    ///
    /// Only `Pending` has outgoing edges; every terminal state requires an
    /// explicit operator requeue, which this crate does not perform.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Enriched | Self::Duplicate | Self::Failed
            )
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Enriched => "enriched",
            Self::Duplicate => "duplicate",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "enriched" => Some(Self::Enriched),
            "duplicate" => Some(Self::Duplicate),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Pending, Self::Enriched, Self::Duplicate, Self::Failed]
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
