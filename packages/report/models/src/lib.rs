#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Value types for unsafe-location reports.
//!
//! A report is built up incrementally as a [`ReportDraft`] while the user
//! edits the page, then frozen into a [`ReportPayload`] whose JSON shape is
//! the wire contract of the remote report API.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a coordinate from the page's `lat`/`lng` query parameters.
    ///
    /// Both values must be present and parse as finite numbers; anything
    /// else is treated as absent.
    #[must_use]
    pub fn from_query(lat: Option<&str>, lng: Option<&str>) -> Option<Self> {
        let latitude = parse_degrees(lat?)?;
        let longitude = parse_degrees(lng?)?;
        Some(Self::new(latitude, longitude))
    }
}

fn parse_degrees(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A candidate place returned by the geocoder.
///
/// Coordinates stay string-encoded exactly as the geocoder sent them and
/// are only converted when the suggestion is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    /// Latitude as sent by the geocoder.
    pub lat: String,
    /// Longitude as sent by the geocoder.
    pub lon: String,
    /// Human-readable place name.
    pub display_name: String,
}

impl PlaceSuggestion {
    /// Parses the string-encoded coordinates.
    ///
    /// Returns `None` if either value is not a finite number.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_query(Some(&self.lat), Some(&self.lon))
    }
}

/// Safety rating chosen by the user, from 1 (very unsafe) to 10.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest selectable rating.
    pub const MIN: u8 = 1;
    /// Highest selectable rating.
    pub const MAX: u8 = 10;

    /// Creates a rating from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-10.
    pub const fn from_value(value: u8) -> Result<Self, InvalidRatingError> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(InvalidRatingError { value })
        }
    }

    /// Returns the numeric value of this rating.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns every selectable rating in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<u8> for Rating {
    type Error = InvalidRatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when attempting to create a [`Rating`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid rating {value}: expected 1-10")]
pub struct InvalidRatingError {
    /// The invalid rating value that was provided.
    pub value: u8,
}

/// A draft field that must be filled in before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum MissingField {
    Description,
    Location,
    Rating,
}

/// Returned by [`ReportDraft::validate`] when the draft is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("incomplete report, missing: {}", join_fields(.missing))]
pub struct DraftError {
    /// Every field that still needs a value, in form order.
    pub missing: Vec<MissingField>,
}

fn join_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(", ")
}

/// The in-progress report held in page state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportDraft {
    /// Opaque identifier of the reporting user, supplied by the route.
    pub user_id: String,
    /// Free-text description of what makes the place unsafe.
    pub description: String,
    /// Location being reported.
    pub coordinate: Option<Coordinate>,
    /// Selected safety rating.
    pub rating: Option<Rating>,
}

impl ReportDraft {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Freezes the draft into a submittable payload.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] listing every missing field when the
    /// description is empty, no coordinate is set or no rating is chosen.
    pub fn validate(&self) -> Result<ReportPayload, DraftError> {
        let mut missing = Vec::new();
        if self.description.is_empty() {
            missing.push(MissingField::Description);
        }
        if self.coordinate.is_none() {
            missing.push(MissingField::Location);
        }
        if self.rating.is_none() {
            missing.push(MissingField::Rating);
        }

        match (self.coordinate, self.rating) {
            (Some(coordinate), Some(rating)) if missing.is_empty() => Ok(ReportPayload {
                userid: self.user_id.clone(),
                description: self.description.clone(),
                latt: coordinate.latitude,
                long: coordinate.longitude,
                rating: rating.value(),
            }),
            _ => Err(DraftError { missing }),
        }
    }

    /// Clears everything the user entered, keeping the user identifier.
    pub fn reset(&mut self) {
        self.description.clear();
        self.coordinate = None;
        self.rating = None;
    }
}

/// Request body of the remote report API.
///
/// Field names and order are the API's wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub userid: String,
    pub description: String,
    pub latt: f64,
    pub long: f64,
    pub rating: u8,
}

/// Prefix carried by every failure status message shown on the page.
pub const FAILURE_PREFIX: &str = "Error";

/// Returns `true` if a page status message reports a failure.
#[must_use]
pub fn is_failure_message(message: &str) -> bool {
    message.starts_with(FAILURE_PREFIX)
}
