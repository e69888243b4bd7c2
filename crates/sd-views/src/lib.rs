//! Sales dashboard view layer

pub mod format;
pub mod panels;
mod session;
mod status;

pub use format::{abbreviate_number, format_change, trim_float};
pub use panels::{default_panels, ChartPanel, PanelKind, PanelView};
pub use session::{DashboardSession, DashboardView};
pub use status::StatusLine;

use sd_core::ValidationError;
use sd_data::DataError;
use thiserror::Error;

/// Errors surfaced by dashboard sessions
#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("unknown panel: {0}")]
    UnknownPanel(String),
}
