//! Dashboard status line

use sd_data::CacheEntry;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusLine {
    /// Fetching is gated until the user picks a filter
    SelectFilters,
    Loading,
    Failed,
    UpToDate,
}

impl StatusLine {
    pub fn from_entry<T>(fetch_enabled: bool, entry: &CacheEntry<T>) -> Self {
        if !fetch_enabled {
            StatusLine::SelectFilters
        } else if entry.is_loading() {
            StatusLine::Loading
        } else if entry.is_error() {
            StatusLine::Failed
        } else {
            StatusLine::UpToDate
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            StatusLine::SelectFilters => "Select filters to load",
            StatusLine::Loading => "Loading…",
            StatusLine::Failed => "Failed to load",
            StatusLine::UpToDate => "Up to date",
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}
