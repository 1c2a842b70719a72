//! Report API endpoint configuration.
//!
//! The default endpoint is embedded from `services/reports_api.toml` at
//! compile time; `REPORTS_API_URL` overrides the URL at runtime.

use serde::Deserialize;

use crate::SubmitError;

const REPORTS_API_TOML: &str = include_str!("../services/reports_api.toml");

/// Where and how reports are submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsApiConfig {
    /// Human-readable name, used in logs.
    pub name: String,
    /// Endpoint receiving the `POST`.
    pub url: String,
    /// Whole-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

impl ReportsApiConfig {
    /// Parses the embedded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Config`] if the embedded TOML is malformed.
    pub fn embedded() -> Result<Self, SubmitError> {
        toml::de::from_str(REPORTS_API_TOML).map_err(|e| SubmitError::Config {
            message: format!("Failed to parse reports API config: {e}"),
        })
    }

    /// Parses the embedded configuration and applies `REPORTS_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Config`] if the embedded TOML is malformed.
    pub fn from_env() -> Result<Self, SubmitError> {
        let mut config = Self::embedded()?;
        if let Some(url) = std::env::var("REPORTS_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
        {
            config.url = url;
        }
        Ok(config)
    }
}
