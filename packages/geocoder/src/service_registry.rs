//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`], [`enabled_services`] and [`primary_service`].

use serde::Deserialize;

use crate::GeocodeError;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may back the place search.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Selection order; lower values win.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` free-form search.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// Comma-separated ISO country codes the search is restricted to.
        country_codes: String,
        /// `User-Agent` sent with every request, required by the public
        /// instance's usage policy.
        user_agent: String,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("nominatim", include_str!("../services/nominatim.toml"))];

/// Parses every embedded service configuration (enabled and disabled).
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] naming the first malformed file.
pub fn all_services() -> Result<Vec<GeocodingService>, GeocodeError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|e| GeocodeError::Config {
                message: format!("Failed to parse geocoding service '{name}': {e}"),
            })
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if any embedded file is malformed.
pub fn enabled_services() -> Result<Vec<GeocodingService>, GeocodeError> {
    let mut services: Vec<GeocodingService> =
        all_services()?.into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    Ok(services)
}

/// Returns the enabled service with the lowest priority value.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if no service is enabled or a file is
/// malformed.
pub fn primary_service() -> Result<GeocodingService, GeocodeError> {
    enabled_services()?
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::Config {
            message: "No geocoding service is enabled".to_string(),
        })
}
