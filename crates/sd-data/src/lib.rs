//! Data fetching, normalization and caching for the sales dashboard

pub mod cache;
pub mod config;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod preferences;
pub mod sources;

use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use cache::{
    CacheEntry, CacheKey, CacheStatus, CacheStore, QueryCache, QueryObserver, QueryOptions,
    QueryType, Subscription,
};
pub use config::{CacheConfig, ProviderConfig};
pub use model::{DashboardData, KpiChange, KpiSnapshot, Narrative, PeriodValue};
pub use orchestrator::FetchOrchestrator;
pub use preferences::{MemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore, UserPreferences};
pub use sources::{AnalyticsProvider, HttpProvider, Route, StaticProvider};

/// Errors that can occur in data operations.
///
/// `Clone` so one in-flight result can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{path} failed{}: {body}", status_suffix(.status))]
    Fetch {
        path: String,
        status: Option<u16>,
        body: String,
    },

    #[error("{path} timed out after {}", display_duration(.after))]
    Timeout { path: String, after: Duration },

    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("preference store error: {0}")]
    Preferences(String),
}

impl DataError {
    /// Whether the error belongs to the "failed to load" family shown next to retained data
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            DataError::Fetch { .. } | DataError::Timeout { .. } | DataError::Parse(_)
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {}", s)).unwrap_or_default()
}

fn display_duration(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

impl From<rusqlite::Error> for DataError {
    fn from(error: rusqlite::Error) -> Self {
        DataError::Preferences(error.to_string())
    }
}

impl From<JoinError> for DataError {
    fn from(error: JoinError) -> Self {
        DataError::Preferences(format!("background task failed: {}", error))
    }
}
