/// Page state definitions for tracking crawl progress
///
/// A URL that has never been dispatched has no state at all; it enters the
/// tracker as `Dispatched` the moment a fetch is about to be issued.
use serde::Serialize;
use std::fmt;

/// Represents the current state of a page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    // ===== Active States =====
    /// Marked visited and the request has been handed to the scheduler
    Dispatched,

    /// A response body is in hand
    Fetched,

    // ===== Terminal States =====
    /// Links and embedded data were extracted and classified
    Processed,

    /// The site answered with a block status; a mirror retry was issued instead
    Blocked,

    /// Fetch, decode or parse failed
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (page may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Dispatched | Self::Fetched)
    }

    /// Checks whether moving from this state to `next` is legal
    ///
    /// ```text
    /// Dispatched -> Fetched -> Processed
    ///      |           |
    ///      +-> Failed <+
    ///      +-> Blocked
    /// ```
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Dispatched, Self::Fetched)
                | (Self::Dispatched, Self::Failed)
                | (Self::Dispatched, Self::Blocked)
                | (Self::Fetched, Self::Processed)
                | (Self::Fetched, Self::Failed)
        )
    }

    /// Short lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched => "dispatched",
            Self::Fetched => "fetched",
            Self::Processed => "processed",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Dispatched,
            Self::Fetched,
            Self::Processed,
            Self::Blocked,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
