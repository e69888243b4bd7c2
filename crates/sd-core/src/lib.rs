//! Core functionality for the sales dashboard
//!
//! This crate provides the filter state, the canonical time-series types and
//! the display window selection used by every other crate.

pub mod filter;
pub mod series;
pub mod window;

use thiserror::Error;

// Re-export commonly used types
pub use filter::{
    Dimension, FilterContext, FilterSelection, FilterState, FilterSubscriber,
};
pub use series::{Granularity, SeriesField, TimeSeriesPoint};
pub use window::{window, window_at, Anchor, Direction, WindowBounds, WindowSpec, WindowUnit};

/// Errors raised when user-facing specifications are invalid
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("window count must be positive, got {0}")]
    NonPositiveCount(i64),

    #[error("anchor {anchor:?} is not supported for {direction:?} windows")]
    UnsupportedAnchor {
        direction: Direction,
        anchor: Anchor,
    },

    #[error("unknown window preset '{0}'")]
    UnknownPreset(String),

    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),
}
