//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CellState`: Tracks the state of individual grid cells (queued, searched, subdivided, etc.)
//! - `CancellationFlag`: Cooperative stop signal shared with the caller

mod cancel;
mod cell_state;

// Re-export main types
pub use cancel::CancellationFlag;
pub use cell_state::CellState;
