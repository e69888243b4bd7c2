//! Provider and cache configuration

pub mod cache_config;
pub mod provider_config;

pub use cache_config::*;
pub use provider_config::*;
