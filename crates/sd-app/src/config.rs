//! Application configuration from arguments and environment

use anyhow::{bail, Context, Result};
use sd_data::config::provider_config::{BASE_URL_VAR, TIMEOUT_VAR};
use sd_data::ProviderConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const DEMO_VAR: &str = "SD_DEMO";
pub const PREFERENCES_DB_VAR: &str = "SD_PREFERENCES_DB";
pub const USER_ID_VAR: &str = "SD_USER_ID";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Serve synthetic data instead of calling the provider
    pub demo: bool,
    /// Provider settings; absent in demo mode
    pub provider: Option<ProviderConfig>,
    pub request_timeout: Duration,
    pub preferences_db: PathBuf,
    pub user_id: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_parts(std::env::args().skip(1), |name| std::env::var(name).ok())
    }

    pub fn from_parts<I, F>(args: I, lookup: F) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut demo = lookup(DEMO_VAR)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        for arg in args {
            match arg.as_str() {
                "--demo" => demo = true,
                other => bail!("unknown argument '{}' (usage: salesdash [--demo])", other),
            }
        }

        let provider = if demo {
            None
        } else {
            let config = ProviderConfig::from_lookup(&lookup)
                .with_context(|| format!("{} must point at the analytics provider, or run with --demo", BASE_URL_VAR))?;
            Some(config)
        };

        let request_timeout = match &provider {
            Some(config) => config.request_timeout,
            None => match lookup(TIMEOUT_VAR) {
                Some(raw) => humantime::parse_duration(raw.trim())
                    .with_context(|| format!("{} is not a valid duration", TIMEOUT_VAR))?,
                None => DEFAULT_TIMEOUT,
            },
        };

        Ok(Self {
            demo,
            provider,
            request_timeout,
            preferences_db: lookup(PREFERENCES_DB_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("preferences.db")),
            user_id: lookup(USER_ID_VAR).unwrap_or_else(|| "local".to_string()),
        })
    }
}
