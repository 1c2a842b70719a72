//! Initial location resolution.
//!
//! Precedence: a valid `lat`/`lng` query pair, then one device geolocation
//! request, then nothing until the user searches or picks on the map.

use std::sync::{Arc, Mutex};

use safety_map_report_models::Coordinate;
use strum_macros::{AsRefStr, Display};

use crate::services::{Geolocator, PositionOptions};
use crate::{PageState, lock};

/// Which source seeded a session's coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum InitialLocation {
    /// Taken from the page's query parameters.
    QueryParams(Coordinate),
    /// A geolocation request is in flight; the coordinate is set when (and
    /// if) it succeeds.
    GeolocationPending,
    /// Nothing available; the user has to choose a location.
    Unset,
}

impl InitialLocation {
    /// Whether a geolocation request was issued.
    #[must_use]
    pub const fn requested_geolocation(&self) -> bool {
        matches!(self, Self::GeolocationPending)
    }
}

/// Seeds `state` with the initial coordinate.
///
/// Spawns at most one geolocation task, and only when `query` holds no
/// coordinate. Geolocation failures are logged and otherwise ignored.
pub(crate) fn resolve(
    query: Option<Coordinate>,
    geolocator: Arc<dyn Geolocator>,
    state: &Arc<Mutex<PageState>>,
) -> InitialLocation {
    if let Some(coordinate) = query {
        lock(state).draft.coordinate = Some(coordinate);
        return InitialLocation::QueryParams(coordinate);
    }

    if !geolocator.is_available() {
        log::debug!("Geolocation unavailable, waiting for the user to choose a location");
        return InitialLocation::Unset;
    }

    let state = Arc::clone(state);
    tokio::spawn(async move {
        match geolocator
            .current_position(PositionOptions::high_accuracy())
            .await
        {
            Ok(coordinate) => {
                log::debug!(
                    "Geolocation resolved to {}, {}",
                    coordinate.latitude,
                    coordinate.longitude
                );
                lock(&state).draft.coordinate = Some(coordinate);
            }
            Err(e) => log::warn!("Error getting location: {e}"),
        }
    });

    InitialLocation::GeolocationPending
}
