//! Map surface gating.
//!
//! The map widget lives on the client. It is only constructed once the
//! client has reported that it is ready; until then the page shows a
//! loading placeholder. Direct picks on the map arrive through
//! [`crate::ReportPage::pick_location`].

use safety_map_report_models::Coordinate;

/// Placeholder text shown while the map widget is not available.
pub const LOADING_PLACEHOLDER: &str = "Loading map...";

/// What the page shows in the map slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapPanel {
    /// Client not ready yet.
    Loading,
    /// The widget is constructed and centred on the current coordinate,
    /// if any.
    Ready {
        /// Current coordinate, passed through to the widget.
        center: Option<Coordinate>,
    },
}

impl MapPanel {
    #[must_use]
    pub const fn new(client_ready: bool, center: Option<Coordinate>) -> Self {
        if client_ready {
            Self::Ready { center }
        } else {
            Self::Loading
        }
    }
}
