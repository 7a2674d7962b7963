//! Link discovery over a paginated listing
//!
//! Discovery drives a single renderer through listing pages, collecting post
//! links from each, until the page cap is hit, a page has no next-page
//! control, or a page fails to render in time. Early stops are not errors:
//! whatever was collected so far is returned.

use crate::config::{Config, NextPagePolicy};
use crate::crawler::parser::{parse_listing, PageSelectors};
use crate::render::{RenderResult, Renderer};
use crate::state::{DiscoveryOutcome, DiscoveryState};
use crate::url::resolve_next_page;
use rand::Rng;
use std::time::Duration;
use url::Url;

/// Post URLs collected by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkList {
    /// Absolute post URLs in discovery order; duplicates are kept
    pub urls: Vec<String>,

    /// Listing pages that were rendered and parsed
    pub pages_visited: u32,

    pub outcome: DiscoveryOutcome,
}

impl LinkList {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Randomized pause between listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDelay {
    pub min: Duration,
    pub max: Duration,
}

impl PageDelay {
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Draws a duration uniformly from `[min, max]`
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Site and pacing parameters for discovery
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub origin: Url,
    pub post_path_prefix: String,
    pub next_page: NextPagePolicy,
    pub listing_timeout: Duration,
    pub delay: PageDelay,
}

impl DiscoveryOptions {
    pub fn from_config(config: &Config, origin: Url) -> Self {
        Self {
            origin,
            post_path_prefix: config.site.post_path_prefix.clone(),
            next_page: config.site.next_page,
            listing_timeout: config.crawler.listing_timeout(),
            delay: PageDelay {
                min: Duration::from_millis(config.crawler.min_page_delay_ms),
                max: Duration::from_millis(config.crawler.max_page_delay_ms),
            },
        }
    }
}

/// Walks the listing from `start`, visiting at most `max_pages` pages
///
/// A cap of zero is treated as one.
pub async fn discover_links(
    renderer: &mut dyn Renderer,
    start: Url,
    max_pages: u32,
    selectors: &PageSelectors,
    options: &DiscoveryOptions,
) -> LinkList {
    let max_pages = max_pages.max(1);
    let mut state = DiscoveryState::Start;
    let mut urls = Vec::new();
    let mut pages_visited = 0u32;
    let mut current = start;

    let outcome = loop {
        advance(&mut state, DiscoveryState::Loading);

        let html = match load_listing(renderer, &current, selectors, options.listing_timeout).await
        {
            Ok(html) => html,
            Err(e) if e.is_timeout() => {
                tracing::warn!("Listing page {} timed out: {}", current, e);
                break DiscoveryOutcome::TimedOut;
            }
            Err(e) => {
                tracing::warn!("Listing page {} failed to load: {}", current, e);
                break DiscoveryOutcome::TimedOut;
            }
        };

        let page = parse_listing(
            &html,
            selectors,
            &options.origin,
            &options.post_path_prefix,
        );
        pages_visited += 1;
        tracing::info!(
            "Listing page {} ({}): {} post links",
            pages_visited,
            current,
            page.post_links.len()
        );
        urls.extend(page.post_links);
        advance(&mut state, DiscoveryState::PageParsed);

        let Some(href) = page.next_href else {
            tracing::info!("No next page after {}, stopping", current);
            break DiscoveryOutcome::NoNextPage;
        };

        if pages_visited >= max_pages {
            break DiscoveryOutcome::Exhausted;
        }

        match resolve_next_page(&href, &options.origin, options.next_page) {
            Ok(next) => current = next,
            Err(e) => {
                tracing::warn!("Cannot follow next-page href '{}': {}", href, e);
                break DiscoveryOutcome::NoNextPage;
            }
        }

        let pause = options.delay.sample();
        tracing::debug!("Sleeping {:?} before {}", pause, current);
        tokio::time::sleep(pause).await;
    };

    advance(&mut state, DiscoveryState::Finished(outcome));

    LinkList {
        urls,
        pages_visited,
        outcome,
    }
}

async fn load_listing(
    renderer: &mut dyn Renderer,
    url: &Url,
    selectors: &PageSelectors,
    timeout: Duration,
) -> RenderResult<String> {
    renderer.navigate(url.as_str()).await?;
    renderer
        .wait_for_element(&selectors.listing_marker, timeout)
        .await?;
    renderer.current_document().await
}

fn advance(state: &mut DiscoveryState, next: DiscoveryState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid discovery transition {:?} -> {:?}",
        state,
        next
    );
    tracing::trace!("Discovery {:?} -> {:?}", state, next);
    *state = next;
}
