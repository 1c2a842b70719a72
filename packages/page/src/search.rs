//! Debounced place search.
//!
//! Every keystroke restarts a [`SEARCH_DEBOUNCE`] quiet period. Only when
//! it elapses is the geocoder queried, so a burst of typing produces a
//! single request for the final text. Queries shorter than
//! [`MIN_QUERY_CHARS`] never reach the geocoder and empty the list at once.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use safety_map_report_models::{Coordinate, PlaceSuggestion};
use tokio::task::JoinHandle;

use crate::services::PlaceSearchProvider;
use crate::{PageError, PageState, lock};

/// Quiet period after the last keystroke before searching.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Shortest query, in characters, that is sent to the geocoder.
pub const MIN_QUERY_CHARS: usize = 3;

/// Whether `query` is long enough to search for.
#[must_use]
pub fn is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_CHARS
}

/// Holds at most one scheduled task; scheduling a new one aborts the old.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Runs `task` once the delay elapses, unless superseded first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Aborts the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        pending.is_some_and(|handle| {
            let running = !handle.is_finished();
            handle.abort();
            running
        })
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Applies a keystroke: stores the query and clears or schedules a search.
pub(crate) fn on_query_changed(
    state: &Arc<Mutex<PageState>>,
    debouncer: &Debouncer,
    places: &Arc<dyn PlaceSearchProvider>,
    query: String,
) {
    let generation = {
        let mut state = lock(state);
        state.search_generation += 1;
        state.query.clone_from(&query);
        if !is_searchable(&query) {
            state.suggestions.clear();
        }
        state.search_generation
    };

    if !is_searchable(&query) {
        if debouncer.cancel() {
            log::debug!("Cancelled pending place search, query too short");
        }
        return;
    }

    let state = Arc::clone(state);
    let places = Arc::clone(places);
    debouncer.schedule(async move {
        log::debug!("Searching places for {query:?}");
        let result = places.search(&query).await;

        let mut state = lock(&state);
        if state.search_generation != generation {
            log::debug!("Discarding stale place results for {query:?}");
            return;
        }
        match result {
            Ok(suggestions) => state.suggestions = suggestions,
            Err(e) => {
                log::warn!("Place search failed for {query:?}: {e}");
                state.suggestions.clear();
            }
        }
    });
}

/// Selects the suggestion at `index`, returning its coordinate.
///
/// The query becomes the suggestion's display name without triggering a new
/// search, and the list is cleared.
pub(crate) fn select(
    state: &Arc<Mutex<PageState>>,
    debouncer: &Debouncer,
    index: usize,
) -> Result<Coordinate, PageError> {
    let mut state = lock(state);
    let count = state.suggestions.len();
    let suggestion: &PlaceSuggestion = state
        .suggestions
        .get(index)
        .ok_or(PageError::SuggestionOutOfRange { index, count })?;
    let coordinate = suggestion
        .coordinate()
        .ok_or_else(|| PageError::InvalidSuggestion {
            display_name: suggestion.display_name.clone(),
        })?;
    let display_name = suggestion.display_name.clone();

    state.search_generation += 1;
    state.draft.coordinate = Some(coordinate);
    state.query = display_name;
    state.suggestions.clear();
    drop(state);

    debouncer.cancel();
    Ok(coordinate)
}
