/// Cell state definitions for tracking sweep progress
///
/// This module defines every state a grid cell can be in during the sweep.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a cell in the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    // ===== Active States =====
    /// Cell is queued and waiting to be searched
    Queued,

    /// Cell's queries are in flight
    Searching,

    // ===== Terminal Success States =====
    /// Every type query finished below the page cap
    Searched,

    /// At least one type query hit the cap; four children were queued
    Subdivided,

    // ===== Terminal Limit States =====
    /// Capped, but already at the maximum depth
    DepthCapped,

    /// Capped, but too small to split further
    TooSmall,

    /// Cell does not touch the boundary polygon and was never searched
    OutsideBoundary,

    // ===== Terminal Error States =====
    /// A query for this cell failed after retries; its results are discarded
    Failed,

    /// Cancellation was requested before the cell was searched
    Cancelled,
}

impl CellState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Searching)
    }

    /// Returns true if this cell's results contribute to the crawl
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Searched | Self::Subdivided | Self::DepthCapped | Self::TooSmall
        )
    }

    /// Returns true if the cell hit the cap but could not be split,
    /// meaning results beyond the cap may have been missed
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::DepthCapped | Self::TooSmall)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Searching => "searching",
            Self::Searched => "searched",
            Self::Subdivided => "subdivided",
            Self::DepthCapped => "depth_capped",
            Self::TooSmall => "too_small",
            Self::OutsideBoundary => "outside_boundary",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all possible cell states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Searching,
            Self::Searched,
            Self::Subdivided,
            Self::DepthCapped,
            Self::TooSmall,
            Self::OutsideBoundary,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
