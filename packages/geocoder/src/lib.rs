#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place search for the safety map.
//!
//! Turns the free text typed into the report page's search box into a
//! ranked list of [`PlaceSuggestion`]s. The backing provider is configured
//! via TOML files in `services/` (see [`service_registry`]) and can be
//! overridden at runtime with:
//!
//! - `GEOCODER_URL`: search endpoint
//! - `GEOCODER_COUNTRY_CODES`: country filter (defaults to `in`)
//!
//! [`PlaceSuggestion`]: safety_map_report_models::PlaceSuggestion

pub mod nominatim;
pub mod service_registry;

use thiserror::Error;

pub use nominatim::NominatimClient;

/// Errors from place search operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The geocoder answered with a non-success status.
    #[error("Geocoder returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Service configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Builds the place-search client from the service registry, applying
/// `GEOCODER_URL` and `GEOCODER_COUNTRY_CODES` overrides.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the registry is malformed or the HTTP client
/// cannot be built.
pub fn client_from_env() -> Result<NominatimClient, GeocodeError> {
    let mut service = service_registry::primary_service()?;
    {
        let service_registry::ProviderConfig::Nominatim {
            base_url,
            country_codes,
            ..
        } = &mut service.provider;

        if let Some(url) = non_empty_env("GEOCODER_URL") {
            *base_url = url;
        }
        if let Some(codes) = non_empty_env("GEOCODER_COUNTRY_CODES") {
            *country_codes = codes;
        }
        log::debug!("Place search restricted to countrycodes={country_codes}");
    }

    log::info!("Place search via {} ({})", service.name, service.base_url());
    NominatimClient::from_service(&service)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
