/// Worker lifecycle definitions
///
/// `Idle -> RendererAcquired -> {Extracting -> RendererAcquired}* -> Released`
use std::fmt;

/// Represents the current state of a post worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// No renderer launched yet
    Idle,

    /// Holding a renderer, between posts
    RendererAcquired,

    /// Rendering and extracting one post
    Extracting,

    /// Renderer closed (or never launched) at shutdown
    Released,
}

impl WorkerState {
    /// Returns true if the transition `self -> next` is allowed
    ///
    /// `Idle -> Released` covers workers that never received a URL.
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Idle, RendererAcquired)
                | (Idle, Released)
                | (RendererAcquired, Extracting)
                | (RendererAcquired, Released)
                | (Extracting, RendererAcquired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RendererAcquired => "renderer_acquired",
            Self::Extracting => "extracting",
            Self::Released => "released",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
