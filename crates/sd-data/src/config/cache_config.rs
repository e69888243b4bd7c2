//! Per-query cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache behaviour for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age after which a successful entry is refetched on next access. `None` never goes stale.
    #[serde(default, with = "humantime_serde_opt")]
    pub stale_time: Option<Duration>,

    /// Whether reads may trigger a fetch
    pub enabled: bool,

    /// Keep showing the previous key's data while a new key loads
    pub retain_previous_on_key_change: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: None,
            enabled: true,
            retain_previous_on_key_change: true,
        }
    }
}

impl CacheConfig {
    /// Dashboard data: never stale, gated until the user picks a filter
    pub fn dashboard() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Lookup lists: fetched once per session
    pub fn lookups() -> Self {
        Self {
            retain_previous_on_key_change: false,
            ..Self::default()
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Serializes `Option<Duration>` as a humantime string such as "5m"
mod humantime_serde_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_str(&humantime::format_duration(*duration).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
