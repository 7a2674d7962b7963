/// Discovery state definitions
///
/// Discovery walks `Start -> Loading -> {PageParsed -> Loading}*` and ends in
/// one of the [`DiscoveryOutcome`] terminal states.
use std::fmt;

/// Why link discovery stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryOutcome {
    /// The page cap was reached
    Exhausted,

    /// A listing page did not show its marker element in time (or failed to load)
    TimedOut,

    /// A listing page had no usable next-page control
    NoNextPage,
}

impl DiscoveryOutcome {
    /// Returns true if discovery ended before the page cap for a reason other
    /// than running out of pages
    pub fn is_early(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::TimedOut => "timed_out",
            Self::NoNextPage => "no_next_page",
        }
    }
}

impl fmt::Display for DiscoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of link discovery in its pagination loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Start,
    /// Waiting for a listing page to render
    Loading,
    /// A listing page was parsed and its links collected
    PageParsed,
    Finished(DiscoveryOutcome),
}

impl DiscoveryState {
    /// Returns true if the transition `self -> next` is part of the loop
    pub fn can_transition_to(&self, next: DiscoveryState) -> bool {
        use DiscoveryState::*;
        matches!(
            (self, next),
            (Start, Loading)
                | (Loading, PageParsed)
                | (Loading, Finished(DiscoveryOutcome::TimedOut))
                | (PageParsed, Loading)
                | (PageParsed, Finished(DiscoveryOutcome::Exhausted))
                | (PageParsed, Finished(DiscoveryOutcome::NoNextPage))
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}
