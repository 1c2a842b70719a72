#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the safety map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the page session types to allow independent evolution of the API
//! contract.

use std::time::Duration;

use safety_map_page::form::{RatingControl, SubmitOutcome};
use safety_map_page::location::InitialLocation;
use safety_map_page::map::{LOADING_PLACEHOLDER, MapPanel};
use safety_map_page::services::PositionOptions;
use safety_map_page::view::PageView;
use safety_map_report_models::{Coordinate, PlaceSuggestion};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Number of open report page sessions.
    pub sessions: usize,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

/// Query parameters of the report page route.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQueryParams {
    /// Initial latitude.
    pub lat: Option<String>,
    /// Initial longitude.
    pub lng: Option<String>,
    /// Whether the client can be asked for its position. Defaults to `true`.
    pub geolocation: Option<bool>,
}

/// A place suggestion as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSuggestion {
    /// Latitude, string-encoded as sent by the geocoder.
    pub lat: String,
    /// Longitude, string-encoded as sent by the geocoder.
    pub lon: String,
    pub display_name: String,
}

impl From<PlaceSuggestion> for ApiSuggestion {
    fn from(s: PlaceSuggestion) -> Self {
        Self {
            lat: s.lat,
            lon: s.lon,
            display_name: s.display_name,
        }
    }
}

/// The map slot.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ApiMapPanel {
    /// Show the placeholder; do not construct the widget yet.
    Loading {
        /// Placeholder text.
        placeholder: String,
    },
    /// Construct the widget centred on `center`.
    Ready {
        /// Current coordinate, `null` when unset.
        center: Option<Coordinate>,
    },
}

impl From<MapPanel> for ApiMapPanel {
    fn from(panel: MapPanel) -> Self {
        match panel {
            MapPanel::Loading => Self::Loading {
                placeholder: LOADING_PLACEHOLDER.to_string(),
            },
            MapPanel::Ready { center } => Self::Ready { center },
        }
    }
}

/// One rating control.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRatingControl {
    /// Rating value (1-10).
    pub value: u8,
    pub highlighted: bool,
}

impl From<RatingControl> for ApiRatingControl {
    fn from(control: RatingControl) -> Self {
        Self {
            value: control.rating.value(),
            highlighted: control.highlighted,
        }
    }
}

/// The submit button.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSubmitButton {
    pub label: String,
    pub disabled: bool,
}

/// A rendered report page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPageView {
    pub heading: String,
    /// Reporting user.
    pub user_id: String,
    /// Place-search box contents.
    pub query: String,
    pub suggestions: Vec<ApiSuggestion>,
    /// Report location, `null` until one is known.
    pub coordinate: Option<Coordinate>,
    pub map: ApiMapPanel,
    pub description: String,
    /// Selected rating (1-10), `null` when none.
    pub rating: Option<u8>,
    pub rating_controls: Vec<ApiRatingControl>,
    pub submit_button: ApiSubmitButton,
    /// Status line of the last submission attempt.
    pub message: Option<String>,
    pub message_is_failure: bool,
}

impl From<PageView> for ApiPageView {
    fn from(view: PageView) -> Self {
        Self {
            heading: view.heading.to_string(),
            user_id: view.user_id,
            query: view.query,
            suggestions: view.suggestions.into_iter().map(Into::into).collect(),
            coordinate: view.coordinate,
            map: view.map.into(),
            description: view.description,
            rating: view.rating.map(|r| r.value()),
            rating_controls: view.rating_controls.into_iter().map(Into::into).collect(),
            submit_button: ApiSubmitButton {
                label: view.submit_button.label.to_string(),
                disabled: view.submit_button.disabled,
            },
            message: view.message,
            message_is_failure: view.message_is_failure,
        }
    }
}

/// Options the client should pass to its position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPositionOptions {
    pub enable_high_accuracy: bool,
    /// Milliseconds; `null` means wait indefinitely.
    pub timeout: Option<u64>,
    /// Milliseconds; `null` accepts any cached position.
    pub maximum_age: Option<u64>,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl From<PositionOptions> for ApiPositionOptions {
    fn from(options: PositionOptions) -> Self {
        Self {
            enable_high_accuracy: options.enable_high_accuracy,
            timeout: options.timeout.map(millis),
            maximum_age: options.maximum_age.map(millis),
        }
    }
}

/// Response of session creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSession {
    pub session_id: Uuid,
    /// Which source seeded the coordinate (`queryParams`,
    /// `geolocationPending` or `unset`).
    pub initial_location: String,
    /// Whether the client must answer `POST /geolocation`.
    pub geolocation_requested: bool,
    /// Present when `geolocation_requested` is.
    pub position_options: Option<ApiPositionOptions>,
    pub view: ApiPageView,
}

impl ApiSession {
    #[must_use]
    pub fn new(session_id: Uuid, initial_location: InitialLocation, view: PageView) -> Self {
        let geolocation_requested = initial_location.requested_geolocation();
        Self {
            session_id,
            initial_location: initial_location.as_ref().to_string(),
            geolocation_requested,
            position_options: geolocation_requested
                .then(|| PositionOptions::high_accuracy().into()),
            view: view.into(),
        }
    }
}

/// Response of `POST /submit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSubmitResult {
    /// `submitted`, `invalid`, `failed` or `inProgress`.
    pub outcome: String,
    pub view: ApiPageView,
}

impl ApiSubmitResult {
    #[must_use]
    pub fn new(outcome: &SubmitOutcome, view: PageView) -> Self {
        let outcome = match outcome {
            SubmitOutcome::Submitted => "submitted",
            SubmitOutcome::Invalid => "invalid",
            SubmitOutcome::Failed(_) => "failed",
            SubmitOutcome::InProgress => "inProgress",
        };
        Self {
            outcome: outcome.to_string(),
            view: view.into(),
        }
    }
}

/// Body of `PUT /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryUpdate {
    pub query: String,
}

/// Body of `PUT /description`.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionUpdate {
    pub description: String,
}

/// Body of `PUT /rating`.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingUpdate {
    pub rating: u8,
}

/// Body of `PUT /hover`; `null` ends the preview.
#[derive(Debug, Clone, Deserialize)]
pub struct HoverUpdate {
    pub rating: Option<u8>,
}

/// Body of `POST /geolocation`: the client's one-shot position answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeolocationReport {
    /// A position fix.
    Position {
        latitude: f64,
        longitude: f64,
    },
    /// A `GeolocationPositionError`.
    Error {
        /// W3C error code (1 = denied, 2 = unavailable, 3 = timeout).
        code: u16,
        message: Option<String>,
    },
}
