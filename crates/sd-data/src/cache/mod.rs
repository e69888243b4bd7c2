//! Reactive async query cache
//!
//! Maps a [`CacheKey`] to a [`CacheEntry`]. Reads are synchronous and may
//! start a background fetch; concurrent reads of an in-flight key share one
//! underlying call. Only the cache's own commit routine writes entries.

mod observer;
mod store;

pub use observer::QueryObserver;
pub use store::{CacheStore, QueryCache, Subscription};

use chrono::{DateTime, Utc};
use sd_core::{Dimension, FilterSelection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::DataError;

/// What a cached query fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// KPI, narrative and both series for one selection
    Dashboard,
    /// Option list for one dimension
    Lookup(Dimension),
}

/// Deterministic identity of a query: query type plus filter selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub query: QueryType,
    pub selection: FilterSelection,
}

impl CacheKey {
    pub fn new(query: QueryType, selection: FilterSelection) -> Self {
        Self { query, selection }
    }

    pub fn dashboard(selection: FilterSelection) -> Self {
        Self::new(QueryType::Dashboard, selection)
    }

    pub fn lookup(dimension: Dimension) -> Self {
        Self::new(QueryType::Lookup(dimension), FilterSelection::default())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.query {
            QueryType::Dashboard => write!(f, "dashboard[{}]", self.selection),
            QueryType::Lookup(dimension) => write!(f, "lookup[{}]", dimension),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cached query.
///
/// An error never clears `data`: a failed refetch keeps the last good
/// result alongside `error`.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub status: CacheStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<DataError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// `data` belongs to another key (or was supplied as placeholder)
    pub is_placeholder: bool,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            last_fetched_at: self.last_fetched_at,
            is_placeholder: self.is_placeholder,
        }
    }
}

impl<T> CacheEntry<T> {
    /// An entry that has never been fetched
    pub fn idle() -> Self {
        Self {
            status: CacheStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            is_placeholder: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == CacheStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == CacheStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == CacheStatus::Error
    }

    /// Fill in `placeholder` when the entry has no data of its own
    pub fn with_placeholder(mut self, placeholder: Option<Arc<T>>) -> Self {
        if self.data.is_none() {
            if let Some(data) = placeholder {
                self.data = Some(data);
                self.is_placeholder = true;
            }
        }
        self
    }
}

/// Options for a single cache read
#[derive(Debug)]
pub struct QueryOptions<T> {
    pub config: CacheConfig,
    /// Shown while the key has no data of its own
    pub placeholder_data: Option<Arc<T>>,
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            placeholder_data: self.placeholder_data.clone(),
        }
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<T> QueryOptions<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            placeholder_data: None,
        }
    }

    pub fn with_placeholder(mut self, data: Option<Arc<T>>) -> Self {
        self.placeholder_data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_identity() {
        let a = CacheKey::dashboard(
            FilterSelection::default().with(Dimension::Sector, Some("office".into())),
        );
        let b = CacheKey::dashboard(
            FilterSelection::default().with(Dimension::Sector, Some("office".into())),
        );
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::lookup(Dimension::Sector));
        assert_eq!(a.to_string(), "dashboard[sector=office,region=*,service=*]");
        assert_eq!(CacheKey::lookup(Dimension::Region).to_string(), "lookup[region]");
    }

    #[test]
    fn test_placeholder_only_fills_empty_entries() {
        let entry: CacheEntry<u32> = CacheEntry::idle().with_placeholder(Some(Arc::new(7)));
        assert_eq!(entry.data.as_deref(), Some(&7));
        assert!(entry.is_placeholder);

        let own = CacheEntry {
            status: CacheStatus::Success,
            data: Some(Arc::new(1)),
            error: None,
            last_fetched_at: None,
            is_placeholder: false,
        }
        .with_placeholder(Some(Arc::new(7)));
        assert_eq!(own.data.as_deref(), Some(&1));
        assert!(!own.is_placeholder);
    }
}
