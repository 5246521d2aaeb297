//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ROYAL_BURGER_API_URL` - Base origin of the ordering API
//!   (e.g., <https://api.royalburger.com.br>)
//!
//! ## Optional
//! - `ROYAL_BURGER_TIMEOUT_SECS` - Per-attempt request timeout (default: 30)
//! - `ROYAL_BURGER_MAX_RETRIES` - Retry budget for transient failures
//!   (default: 3)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default per-attempt request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of automatic retries for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base origin of the ordering API; relative request paths are
    /// resolved against it.
    pub base_url: Url,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Retry budget for transient failures.
    pub max_retries: u32,
}

impl ClientConfig {
    /// Create a configuration with default timeout and retry budget.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("ROYAL_BURGER_API_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ROYAL_BURGER_API_URL".to_string(), e.to_string())
            })?;

        let timeout_secs = get_env_or_default("ROYAL_BURGER_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ROYAL_BURGER_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let max_retries = get_env_or_default("ROYAL_BURGER_MAX_RETRIES", "3")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ROYAL_BURGER_MAX_RETRIES".to_string(), e.to_string())
            })?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let config = ClientConfig::new("http://localhost:5000".parse().unwrap());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.base_url.as_str(), "http://localhost:5000/");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("ROYAL_BURGER_API_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: ROYAL_BURGER_API_URL"
        );
    }
}
