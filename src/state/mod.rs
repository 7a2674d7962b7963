//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `DiscoveryState` / `DiscoveryOutcome`: where link discovery is in its
//!   pagination loop, and why it stopped
//! - `WorkerState`: the lifecycle of one post worker and its renderer

mod discovery_state;
mod worker_state;

// Re-export main types
pub use discovery_state::{DiscoveryOutcome, DiscoveryState};
pub use worker_state::WorkerState;
