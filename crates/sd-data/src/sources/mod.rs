//! Analytics provider access

pub mod http_source;
pub mod static_source;

pub use http_source::HttpProvider;
pub use static_source::{Method, RecordedCall, Route, StaticProvider};

use async_trait::async_trait;
use serde_json::Value;

use crate::DataError;

/// Trait for analytics providers.
///
/// Implementations return the raw JSON body of a successful response.
/// Non-success responses become [`DataError::Fetch`].
#[async_trait]
pub trait AnalyticsProvider: Send + Sync {
    /// POST a JSON body to `path`
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, DataError>;

    /// GET `path`
    async fn get_json(&self, path: &str) -> Result<Value, DataError>;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
