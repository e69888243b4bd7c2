//! User preference persistence
//!
//! Preferences hold the user's preferred sectors, regions and services. The
//! first element of each list seeds the filter selection at session start.

mod sqlite_store;

pub use sqlite_store::SqlitePreferenceStore;

use async_trait::async_trait;
use parking_lot::RwLock;
use sd_core::{Dimension, FilterSelection};
use serde::{Deserialize, Serialize};

use crate::DataError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

impl UserPreferences {
    /// Initial filter selection: the first preferred value of each dimension
    pub fn defaults(&self) -> FilterSelection {
        Dimension::ALL
            .iter()
            .fold(FilterSelection::default(), |selection, dimension| {
                let first = self.values(*dimension).first().cloned();
                selection.with(*dimension, first)
            })
    }

    /// Preferences recording the current selection. "All" stores an empty list.
    pub fn from_selection(selection: &FilterSelection) -> Self {
        let list = |dimension: Dimension| selection.get(dimension).map(|v| vec![v.to_string()]).unwrap_or_default();
        Self {
            sectors: list(Dimension::Sector),
            regions: list(Dimension::Region),
            services: list(Dimension::Service),
        }
    }

    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Sector => &self.sectors,
            Dimension::Region => &self.regions,
            Dimension::Service => &self.services,
        }
    }
}

/// Trait for preference stores
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load the stored preferences, `None` if nothing was saved yet
    async fn load(&self) -> Result<Option<UserPreferences>, DataError>;

    /// Replace the stored preferences
    async fn save(&self, preferences: &UserPreferences) -> Result<(), DataError>;
}

/// Preferences kept for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    stored: RwLock<Option<UserPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new(initial: Option<UserPreferences>) -> Self {
        Self {
            stored: RwLock::new(initial),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Option<UserPreferences>, DataError> {
        Ok(self.stored.read().clone())
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<(), DataError> {
        *self.stored.write() = Some(preferences.clone());
        Ok(())
    }
}
