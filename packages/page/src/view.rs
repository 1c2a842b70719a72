//! Rendered snapshot of a report page.

use safety_map_report_models::{Coordinate, PlaceSuggestion, Rating, is_failure_message};

use crate::PageState;
use crate::form::{RatingControl, SubmitButton, rating_controls};
use crate::map::MapPanel;

/// Page heading.
pub const HEADING: &str = "Report an Unsafe Location";

/// Everything a client needs to draw the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub heading: &'static str,
    /// Reporting user, displayed under the heading.
    pub user_id: String,
    pub query: String,
    pub suggestions: Vec<PlaceSuggestion>,
    /// Location the report will be filed for, whether or not the map is
    /// shown yet.
    pub coordinate: Option<Coordinate>,
    pub map: MapPanel,
    pub description: String,
    pub rating: Option<Rating>,
    pub rating_controls: Vec<RatingControl>,
    pub submit_button: SubmitButton,
    /// Transient status line of the last submission attempt.
    pub message: Option<String>,
    pub message_is_failure: bool,
}

impl PageView {
    pub(crate) fn render(state: &PageState) -> Self {
        let draft = &state.draft;
        Self {
            heading: HEADING,
            user_id: draft.user_id.clone(),
            query: state.query.clone(),
            suggestions: state.suggestions.clone(),
            coordinate: draft.coordinate,
            map: MapPanel::new(state.client_ready, draft.coordinate),
            description: draft.description.clone(),
            rating: draft.rating,
            rating_controls: rating_controls(draft.rating, state.hover),
            submit_button: SubmitButton::new(state.submitting),
            message: state.message.clone(),
            message_is_failure: state.message.as_deref().is_some_and(is_failure_message),
        }
    }
}
