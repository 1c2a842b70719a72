//! Report form presentation: rating controls, submit button and the status
//! line.

use std::fmt::Display;

use safety_map_report_models::{FAILURE_PREFIX, Rating};

/// Status shown when the draft is incomplete.
pub const VALIDATION_MESSAGE: &str =
    "Error: please add a description, choose a location and select a rating.";

/// Status shown after the API accepted the report.
pub const SUCCESS_MESSAGE: &str = "Report submitted successfully!";

/// Submit button label while idle.
pub const SUBMIT_LABEL: &str = "Submit Report";

/// Submit button label while a submission is in flight.
pub const SUBMITTING_LABEL: &str = "Submitting...";

/// Status shown when a submission failed.
#[must_use]
pub fn failure_message(error: &impl Display) -> String {
    format!("{FAILURE_PREFIX} submitting report: {error}")
}

/// One of the ten rating controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingControl {
    pub rating: Rating,
    /// Lit up as part of the hover preview or the current selection.
    pub highlighted: bool,
}

/// Renders the rating controls.
///
/// Controls up to the hovered rating are highlighted while hovering,
/// otherwise up to the selected one.
#[must_use]
pub fn rating_controls(selected: Option<Rating>, hover: Option<Rating>) -> Vec<RatingControl> {
    let active = hover.or(selected);
    Rating::all()
        .map(|rating| RatingControl {
            rating,
            highlighted: active.is_some_and(|active| rating <= active),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitButton {
    pub label: &'static str,
    pub disabled: bool,
}

impl SubmitButton {
    #[must_use]
    pub const fn new(submitting: bool) -> Self {
        if submitting {
            Self {
                label: SUBMITTING_LABEL,
                disabled: true,
            }
        } else {
            Self {
                label: SUBMIT_LABEL,
                disabled: false,
            }
        }
    }
}

/// What a call to [`crate::ReportPage::submit`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The API accepted the report and the form was reset.
    Submitted,
    /// The draft was incomplete; nothing was sent.
    Invalid,
    /// The request failed; the form keeps its contents.
    Failed(String),
    /// Another submission is still in flight; nothing was sent.
    InProgress,
}
