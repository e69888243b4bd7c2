//! Analytics provider configuration

use reqwest::Url;
use std::time::Duration;

use crate::DataError;

/// Environment variable holding the provider base address
pub const BASE_URL_VAR: &str = "API_BASE_URL";

/// Environment variable holding the per-call timeout, e.g. "30s"
pub const TIMEOUT_VAR: &str = "SD_REQUEST_TIMEOUT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the analytics provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Base address every endpoint path is resolved against
    pub base_url: Url,

    /// Upper bound for a single provider call
    pub request_timeout: Duration,

    pub user_agent: String,
}

impl ProviderConfig {
    /// Create a configuration for `base_url` with default settings
    pub fn new(base_url: &str) -> Result<Self, DataError> {
        let base_url = Url::parse(base_url.trim()).map_err(|e| {
            DataError::Configuration(format!("{} is not a valid URL: {}", BASE_URL_VAR, e))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(DataError::Configuration(format!(
                "{} must use http or https, got '{}'",
                BASE_URL_VAR,
                base_url.scheme()
            )));
        }

        Ok(Self {
            base_url,
            request_timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("salesdash/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, DataError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                DataError::Configuration(format!(
                    "{} is not configured. Set {} before calling the analytics provider.",
                    BASE_URL_VAR, BASE_URL_VAR
                ))
            })?;

        let mut config = Self::new(&base_url)?;

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.request_timeout = humantime::parse_duration(raw.trim()).map_err(|e| {
                DataError::Configuration(format!("{} is not a valid duration: {}", TIMEOUT_VAR, e))
            })?;
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
