#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The report page session.
//!
//! A [`ReportPage`] is one visitor's page: the location being reported,
//! the place-search box, the map slot and the report form. All state lives
//! in an explicit [`PageState`] that is only changed through the page's
//! mutators; every mutator is cheap and synchronous except
//! [`ReportPage::submit`], which awaits the report API.
//!
//! Background work is limited to two kinds of tasks:
//!
//! - one geolocation request at open time, when the page was opened
//!   without a `lat`/`lng` pair (see [`location`])
//! - the debounced place search (see [`search`])
//!
//! Both write into the shared state when they finish; whichever write
//! lands last wins.

pub mod form;
pub mod location;
pub mod map;
pub mod search;
pub mod services;
pub mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use safety_map_geocoder::GeocodeError;
use safety_map_report_models::{Coordinate, PlaceSuggestion, Rating, ReportDraft};
use safety_map_submission::{ReportsApiClient, SubmitError};
use thiserror::Error;

use crate::form::{SUCCESS_MESSAGE, SubmitOutcome, VALIDATION_MESSAGE, failure_message};
use crate::location::InitialLocation;
use crate::search::{Debouncer, SEARCH_DEBOUNCE};
use crate::services::{Geolocator, PlaceSearchProvider, ReportSubmitter};
use crate::view::PageView;

/// Errors from page operations.
#[derive(Debug, Error)]
pub enum PageError {
    /// A suggestion index past the end of the current list.
    #[error("No suggestion at index {index} (have {count})")]
    SuggestionOutOfRange {
        /// Requested index.
        index: usize,
        /// Current list length.
        count: usize,
    },

    /// The geocoder sent coordinates that are not numbers.
    #[error("Suggestion {display_name:?} has no usable coordinates")]
    InvalidSuggestion {
        /// The offending suggestion's name.
        display_name: String,
    },

    /// Place search could not be configured.
    #[error("Geocoder error: {0}")]
    Geocoder(#[from] GeocodeError),

    /// Report submission could not be configured.
    #[error("Submission error: {0}")]
    Submission(#[from] SubmitError),
}

/// Mutable state of one report page.
#[derive(Debug, Default)]
pub struct PageState {
    draft: ReportDraft,
    query: String,
    suggestions: Vec<PlaceSuggestion>,
    /// Bumped whenever the query changes so late search results can be
    /// recognised and dropped.
    search_generation: u64,
    hover: Option<Rating>,
    message: Option<String>,
    submitting: bool,
    client_ready: bool,
}

pub(crate) fn lock(state: &Mutex<PageState>) -> MutexGuard<'_, PageState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remote services shared by every page.
#[derive(Clone)]
pub struct PageServices {
    pub places: Arc<dyn PlaceSearchProvider>,
    pub reports: Arc<dyn ReportSubmitter>,
}

impl PageServices {
    /// Builds the production services from their embedded configuration
    /// and environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if either client cannot be configured.
    pub fn from_env() -> Result<Self, PageError> {
        Ok(Self {
            places: Arc::new(safety_map_geocoder::client_from_env()?),
            reports: Arc::new(ReportsApiClient::from_env()?),
        })
    }
}

/// Records the report API's answer. `submitting` is cleared last.
fn finish_submission(
    state: &Mutex<PageState>,
    result: Result<serde_json::Value, SubmitError>,
) -> SubmitOutcome {
    let mut state = lock(state);
    let outcome = match result {
        Ok(response) => {
            log::debug!("Report accepted: {response}");
            state.message = Some(SUCCESS_MESSAGE.to_string());
            state.draft.reset();
            SubmitOutcome::Submitted
        }
        Err(e) => {
            log::error!("Report submission failed: {e}");
            let message = failure_message(&e);
            state.message = Some(message.clone());
            SubmitOutcome::Failed(message)
        }
    };
    state.submitting = false;
    outcome
}

/// One visitor's report page.
pub struct ReportPage {
    state: Arc<Mutex<PageState>>,
    services: PageServices,
    search: Debouncer,
    initial_location: InitialLocation,
}

impl ReportPage {
    /// Opens a page for `user_id`.
    ///
    /// `query_coordinate` is the page's `lat`/`lng` pair, if valid. Without
    /// one, a single geolocation request is issued when `geolocator` is
    /// available. Must be called from within a tokio runtime.
    pub fn open(
        user_id: impl Into<String>,
        query_coordinate: Option<Coordinate>,
        services: PageServices,
        geolocator: Arc<dyn Geolocator>,
    ) -> Self {
        let state = Arc::new(Mutex::new(PageState {
            draft: ReportDraft::new(user_id),
            ..PageState::default()
        }));
        let initial_location = location::resolve(query_coordinate, geolocator, &state);

        Self {
            state,
            services,
            search: Debouncer::new(SEARCH_DEBOUNCE),
            initial_location,
        }
    }

    /// How the coordinate was seeded when the page was opened.
    #[must_use]
    pub const fn initial_location(&self) -> InitialLocation {
        self.initial_location
    }

    #[must_use]
    pub fn view(&self) -> PageView {
        PageView::render(&lock(&self.state))
    }

    /// Applies a keystroke in the place-search box.
    pub fn set_query(&self, query: impl Into<String>) {
        search::on_query_changed(
            &self.state,
            &self.search,
            &self.services.places,
            query.into(),
        );
    }

    /// Selects a place suggestion as the report location.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if there is no suggestion at `index` or its
    /// coordinates cannot be parsed; the page is left unchanged.
    pub fn select_suggestion(&self, index: usize) -> Result<Coordinate, PageError> {
        search::select(&self.state, &self.search, index)
    }

    /// Submits the search form: selects the first suggestion, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidSuggestion`] if the first suggestion's
    /// coordinates cannot be parsed.
    pub fn submit_search(&self) -> Result<Option<Coordinate>, PageError> {
        if lock(&self.state).suggestions.is_empty() {
            return Ok(None);
        }
        self.select_suggestion(0).map(Some)
    }

    /// Map callback: the user picked a point directly on the map.
    pub fn pick_location(&self, coordinate: Coordinate) {
        lock(&self.state).draft.coordinate = Some(coordinate);
    }

    /// The client is interactive; the map widget may be constructed.
    pub fn mark_client_ready(&self) {
        lock(&self.state).client_ready = true;
    }

    pub fn set_description(&self, description: impl Into<String>) {
        lock(&self.state).draft.description = description.into();
    }

    pub fn set_rating(&self, rating: Rating) {
        lock(&self.state).draft.rating = Some(rating);
    }

    /// Hover preview over the rating controls; `None` when the pointer
    /// leaves them.
    pub fn hover_rating(&self, rating: Option<Rating>) {
        lock(&self.state).hover = rating;
    }

    /// Validates the draft and sends it to the report API.
    ///
    /// Never retries. While a submission is in flight further calls return
    /// [`SubmitOutcome::InProgress`] without sending anything. The request
    /// runs on its own task, so dropping the returned future does not
    /// cancel it: the page still records the outcome and leaves the
    /// submitting state. Must be called from within a tokio runtime.
    pub async fn submit(&self) -> SubmitOutcome {
        let payload = {
            let mut state = lock(&self.state);
            if state.submitting {
                return SubmitOutcome::InProgress;
            }
            match state.draft.validate() {
                Ok(payload) => {
                    state.submitting = true;
                    state.message = None;
                    payload
                }
                Err(e) => {
                    log::debug!("Not submitting: {e}");
                    state.message = Some(VALIDATION_MESSAGE.to_string());
                    return SubmitOutcome::Invalid;
                }
            }
        };

        log::info!(
            "Submitting report for user {} at {}, {} (rating {})",
            payload.userid,
            payload.latt,
            payload.long,
            payload.rating
        );

        let state = Arc::clone(&self.state);
        let reports = Arc::clone(&self.services.reports);
        let task = tokio::spawn(async move {
            let result = reports.submit(&payload).await;
            finish_submission(&state, result)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Report submission task failed: {e}");
                let message = failure_message(&e);
                let mut state = lock(&self.state);
                state.message = Some(message.clone());
                state.submitting = false;
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Tears the page down, cancelling any pending place search.
    pub fn close(&self) {
        if self.search.cancel() {
            log::debug!("Cancelled pending place search on close");
        }
    }
}
