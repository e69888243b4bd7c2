//! SQLite preference store

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{PreferenceStore, UserPreferences};
use crate::DataError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS user_preference (
    user_id TEXT PRIMARY KEY,
    sectors TEXT NOT NULL,
    regions TEXT NOT NULL,
    services TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Preferences persisted per user in a SQLite database
#[derive(Debug, Clone)]
pub struct SqlitePreferenceStore {
    path: PathBuf,
    user_id: String,
}

impl SqlitePreferenceStore {
    /// Create a new store, creating the database and table if needed
    pub async fn open<P: AsRef<Path>>(path: P, user_id: impl Into<String>) -> Result<Self, DataError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            user_id: user_id.into(),
        };

        let path = store.path.clone();
        tokio::task::spawn_blocking(move || Self::connect(&path).map(|_| ())).await??;

        info!(path = %store.path.display(), user = %store.user_id, "Opened preference store");
        Ok(store)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn connect(path: &Path) -> Result<Connection, DataError> {
        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        Ok(conn)
    }

    fn read(path: &Path, user_id: &str) -> Result<Option<UserPreferences>, DataError> {
        let conn = Self::connect(path)?;
        let row = conn
            .query_row(
                "SELECT sectors, regions, services FROM user_preference WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        row.map(|(sectors, regions, services)| {
            Ok(UserPreferences {
                sectors: decode_list(&sectors)?,
                regions: decode_list(&regions)?,
                services: decode_list(&services)?,
            })
        })
        .transpose()
    }

    fn write(path: &Path, user_id: &str, preferences: &UserPreferences) -> Result<(), DataError> {
        let conn = Self::connect(path)?;
        conn.execute(
            "INSERT INTO user_preference (user_id, sectors, regions, services, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                sectors = excluded.sectors,
                regions = excluded.regions,
                services = excluded.services,
                updated_at = excluded.updated_at",
            params![
                user_id,
                encode_list(&preferences.sectors)?,
                encode_list(&preferences.regions)?,
                encode_list(&preferences.services)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn encode_list(values: &[String]) -> Result<String, DataError> {
    serde_json::to_string(values).map_err(|e| DataError::Preferences(e.to_string()))
}

fn decode_list(raw: &str) -> Result<Vec<String>, DataError> {
    serde_json::from_str(raw).map_err(|e| DataError::Preferences(format!("corrupt preference list: {}", e)))
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn load(&self) -> Result<Option<UserPreferences>, DataError> {
        let path = self.path.clone();
        let user_id = self.user_id.clone();
        let preferences = tokio::task::spawn_blocking(move || Self::read(&path, &user_id)).await??;
        debug!(user = %self.user_id, found = preferences.is_some(), "Loaded preferences");
        Ok(preferences)
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<(), DataError> {
        let path = self.path.clone();
        let user_id = self.user_id.clone();
        let preferences = preferences.clone();
        tokio::task::spawn_blocking(move || Self::write(&path, &user_id, &preferences)).await??;
        info!(user = %self.user_id, "Saved preferences");
        Ok(())
    }
}
