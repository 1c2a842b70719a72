//! Remote collaborators of the report page.
//!
//! Each collaborator sits behind a trait so that sessions can be driven by
//! the real HTTP clients in production and by in-memory fakes in tests.

use std::time::Duration;

use safety_map_geocoder::{GeocodeError, NominatimClient};
use safety_map_report_models::{Coordinate, PlaceSuggestion, ReportPayload};
use safety_map_submission::{ReportsApiClient, SubmitError};
use thiserror::Error;

/// Free-text place search.
#[async_trait::async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    /// Returns the places matching `query`, best match first.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the search cannot be performed.
    async fn search(&self, query: &str) -> Result<Vec<PlaceSuggestion>, GeocodeError>;
}

#[async_trait::async_trait]
impl PlaceSearchProvider for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<PlaceSuggestion>, GeocodeError> {
        Self::search(self, query).await
    }
}

/// Destination of finished reports.
#[async_trait::async_trait]
pub trait ReportSubmitter: Send + Sync {
    /// Sends one report and returns the API's response payload.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] on transport failure or rejection.
    async fn submit(&self, payload: &ReportPayload) -> Result<serde_json::Value, SubmitError>;
}

#[async_trait::async_trait]
impl ReportSubmitter for ReportsApiClient {
    async fn submit(&self, payload: &ReportPayload) -> Result<serde_json::Value, SubmitError> {
        Self::submit(self, payload).await
    }
}

/// Options for a one-shot position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionOptions {
    /// Ask for the most accurate fix the device can provide.
    pub enable_high_accuracy: bool,
    /// Give up after this long.
    pub timeout: Option<Duration>,
    /// Accept a cached position no older than this.
    pub maximum_age: Option<Duration>,
}

/// How long the device gets to produce a fix.
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);

impl PositionOptions {
    /// High-accuracy request that gives up after [`GEOLOCATION_TIMEOUT`]
    /// and refuses cached positions.
    #[must_use]
    pub const fn high_accuracy() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Some(GEOLOCATION_TIMEOUT),
            maximum_age: Some(Duration::ZERO),
        }
    }
}

/// Why a position request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// The user refused to share their location.
    #[error("User denied geolocation")]
    PermissionDenied,
    /// The device could not determine a position.
    #[error("Position unavailable")]
    PositionUnavailable,
    /// No fix arrived within the requested timeout.
    #[error("Geolocation timed out")]
    Timeout,
    /// The request was dropped before an answer arrived.
    #[error("Geolocation request abandoned")]
    Abandoned,
}

impl GeolocationError {
    /// Maps a W3C `GeolocationPositionError.code` to an error.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }
}

/// The device's geolocation capability.
#[async_trait::async_trait]
pub trait Geolocator: Send + Sync {
    /// Whether a position can be requested at all.
    fn is_available(&self) -> bool;

    /// Requests the current position once.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if no position could be obtained.
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError>;
}

/// A geolocator for clients without the capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait::async_trait]
impl Geolocator for NoGeolocation {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        Err(GeolocationError::PositionUnavailable)
    }
}
