//! Output module for harvest statistics and the end-of-run summary
//!
//! Workers record what happened to each post in a shared [`HarvestStats`];
//! the coordinator turns the counters into a [`FetchReport`] and, together
//! with the discovery result, a [`HarvestSummary`] that the binary prints.

pub mod stats;

pub use stats::{print_summary, FetchReport, HarvestStats, HarvestSummary};
