//! Crawler module for link discovery and post extraction
//!
//! This module contains the core harvesting logic, including:
//! - Listing and post page parsing
//! - Paginated link discovery
//! - Per-post extraction with contained failures
//! - Overall coordination of discovery and the worker pool

mod coordinator;
mod discovery;
mod extractor;
mod parser;

pub use coordinator::Coordinator;
pub use discovery::{discover_links, DiscoveryOptions, LinkList, PageDelay};
pub use extractor::{extract, extract_post, Extraction};
pub use parser::{
    parse_listing, parse_post, ListingPage, PageSelectors, NO_COMMENT, NO_CONTENT, UNKNOWN_TIME,
};

use crate::config::Config;
use crate::output::HarvestSummary;
use crate::Result;

/// Runs a complete harvest with the backends named by `config`
///
/// This is the main entry point for a run. It will:
/// 1. Open the store and build the renderer factory
/// 2. Discover post links across up to `max_pages` listing pages
/// 3. Extract every post with the configured worker pool
/// 4. Return the run summary
pub async fn harvest(config: Config, max_pages: u32) -> Result<HarvestSummary> {
    Coordinator::from_config(config)?.run(max_pages).await
}
