//! Geolocation answered by the client.
//!
//! The position comes from the visitor's device, so the session's one-shot
//! geolocation request is a oneshot channel: the page awaits the receiving
//! half while `POST /api/sessions/{id}/geolocation` delivers into the
//! sending half.

use std::sync::Mutex;

use safety_map_page::services::{GeolocationError, Geolocator, PositionOptions};
use safety_map_report_models::Coordinate;
use tokio::sync::oneshot;

/// The client's answer to a position request.
pub type PositionResult = Result<Coordinate, GeolocationError>;

/// Sending half, kept by the session until the client answers.
pub type PositionSender = oneshot::Sender<PositionResult>;

/// A [`Geolocator`] resolved by the client over HTTP.
pub struct ClientGeolocator {
    available: bool,
    receiver: Mutex<Option<oneshot::Receiver<PositionResult>>>,
}

impl ClientGeolocator {
    /// Creates a geolocator and the sender the client's answer goes into.
    ///
    /// `available` reflects whether the client has the capability at all.
    #[must_use]
    pub fn channel(available: bool) -> (Self, PositionSender) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                available,
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl Geolocator for ClientGeolocator {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .ok_or(GeolocationError::Abandoned)?;

        let answer = match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, receiver)
                .await
                .map_err(|_| GeolocationError::Timeout)?,
            None => receiver.await,
        };

        answer.unwrap_or(Err(GeolocationError::Abandoned))
    }
}
