//! Harvest coordinator - discovery followed by concurrent post extraction
//!
//! The coordinator owns everything a run needs: the configuration, the
//! compiled selectors, a renderer factory and the store. A run is two
//! phases:
//! - Discovery walks the listing with one dedicated renderer, which is closed
//!   before any post is fetched
//! - A fixed set of workers drains the discovered URLs from a shared queue,
//!   each reusing the renderer it launched for its first URL and merging
//!   every record into the store as soon as it is extracted

use crate::config::Config;
use crate::crawler::discovery::{discover_links, DiscoveryOptions, LinkList};
use crate::crawler::extractor::{extract, Extraction};
use crate::crawler::parser::PageSelectors;
use crate::output::{FetchReport, HarvestStats, HarvestSummary};
use crate::record::PostRecord;
use crate::render::{build_factory, Identity, RendererFactory, RendererPool};
use crate::state::WorkerState;
use crate::storage::{open_store, Storage};
use crate::url::parse_http_url;
use crate::{HarvestError, Result};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// Post URLs not yet claimed by a worker
type WorkQueue = Arc<Mutex<VecDeque<String>>>;

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    selectors: Arc<PageSelectors>,
    factory: Arc<dyn RendererFactory>,
    storage: Arc<dyn Storage>,
    origin: Url,
}

impl Coordinator {
    /// Creates a coordinator from its parts
    ///
    /// Fails if a selector does not compile or the site origin is not an
    /// absolute http(s) URL.
    pub fn new(
        config: Config,
        factory: Arc<dyn RendererFactory>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let selectors = PageSelectors::compile(&config.selectors)?;
        let origin = parse_http_url(&config.site.origin)?;

        Ok(Self {
            config: Arc::new(config),
            selectors: Arc::new(selectors),
            factory,
            storage,
            origin,
        })
    }

    /// Creates a coordinator with the renderer backend and store named by
    /// the configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let factory = build_factory(&config.renderer);
        let storage = open_store(&config.output)?;
        Self::new(config, factory, storage)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Discovers post links starting at the configured start URL
    ///
    /// Runs on its own renderer, closed before returning. Only a failure to
    /// launch that renderer is an error; an early stop is reported through
    /// the returned outcome.
    pub async fn discover(&self, max_pages: u32) -> Result<LinkList> {
        let start = parse_http_url(&self.config.site.start_url)?;
        let identity = Identity::random(&self.config.renderer.user_agents, "discovery");
        let mut renderer = self.factory.launch(identity).await?;

        let options = DiscoveryOptions::from_config(&self.config, self.origin.clone());
        let links = discover_links(
            renderer.as_mut(),
            start,
            max_pages,
            &self.selectors,
            &options,
        )
        .await;

        if let Err(e) = renderer.close().await {
            tracing::warn!("Failed to close discovery renderer: {}", e);
        }

        Ok(links)
    }

    /// Extracts every post in `links` with `max_workers` workers
    ///
    /// Records are merged into the store as they arrive. Every renderer the
    /// workers launched is released before this returns. A worker count of
    /// zero is treated as one.
    pub async fn fetch_all(&self, links: Vec<String>, max_workers: usize) -> FetchReport {
        let workers = max_workers.max(1);
        tracing::info!("Fetching {} posts with {} workers", links.len(), workers);

        let pool = Arc::new(RendererPool::new(
            Arc::clone(&self.factory),
            self.config.renderer.user_agents.clone(),
            workers,
        ));
        let queue: WorkQueue = Arc::new(Mutex::new(links.into_iter().collect()));
        let stats = Arc::new(HarvestStats::new());

        let handles: Vec<_> = (0..workers)
            .map(|index| {
                let worker = Worker {
                    index,
                    pool: Arc::clone(&pool),
                    queue: Arc::clone(&queue),
                    selectors: Arc::clone(&self.selectors),
                    storage: Arc::clone(&self.storage),
                    stats: Arc::clone(&stats),
                    post_timeout: self.config.crawler.post_timeout(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Worker {} stopped: {}", index, e),
                Err(e) => tracing::error!("Worker {} panicked: {}", index, e),
            }
        }

        let unprocessed = queue.lock().unwrap_or_else(PoisonError::into_inner).len();
        if unprocessed > 0 {
            tracing::warn!("{} posts left unprocessed: no worker had a renderer", unprocessed);
        }

        let release = pool.release_all().await;
        tracing::debug!(
            "Released renderers: {} closed, {} errors, {} skipped",
            release.closed,
            release.close_errors,
            release.skipped
        );

        stats.report(unprocessed, release)
    }

    /// Runs a complete harvest: discovery, then extraction
    pub async fn run(&self, max_pages: u32) -> Result<HarvestSummary> {
        let started_at = Utc::now();
        tracing::info!(
            "Starting harvest of {} (up to {} listing pages)",
            self.config.site.start_url,
            max_pages
        );

        let links = self.discover(max_pages).await?;
        tracing::info!(
            "Discovered {} post links on {} listing pages ({})",
            links.len(),
            links.pages_visited,
            links.outcome
        );

        if links.outcome.is_early() {
            tracing::warn!("Discovery stopped early, harvesting the links found so far");
        }

        let pages_visited = links.pages_visited;
        let outcome = links.outcome;
        let links_found = links.len();
        let fetch = self
            .fetch_all(links.urls, self.config.crawler.max_workers)
            .await;

        let store_entries = match self.storage.len() {
            Ok(total) => Some(total),
            Err(e) => {
                tracing::warn!("Failed to read store size: {}", e);
                None
            }
        };

        tracing::info!(
            "Harvest completed: {} of {} posts extracted, {} merged",
            fetch.records,
            fetch.attempted,
            fetch.merged
        );

        Ok(HarvestSummary {
            started_at,
            finished_at: Utc::now(),
            pages_visited,
            links_found,
            outcome,
            fetch,
            store_entries,
        })
    }
}

/// One post worker and the shared state it needs
struct Worker {
    index: usize,
    pool: Arc<RendererPool>,
    queue: WorkQueue,
    selectors: Arc<PageSelectors>,
    storage: Arc<dyn Storage>,
    stats: Arc<HarvestStats>,
    post_timeout: Duration,
}

impl Worker {
    async fn run(self) -> Result<()> {
        let mut state = WorkerState::Idle;

        // The renderer is launched before a URL is claimed, so a failed
        // launch never strands work that other workers could still take.
        if self.queue_is_empty() {
            tracing::debug!("Worker {} found no work", self.index);
            self.advance(&mut state, WorkerState::Released)?;
            return Ok(());
        }

        let mut renderer = match self.pool.acquire(self.index).await {
            Ok(lease) => lease,
            Err(e) => {
                tracing::error!("Worker {} has no renderer, stopping: {}", self.index, e);
                self.stats.record_lost_worker();
                self.advance(&mut state, WorkerState::Released)?;
                return Ok(());
            }
        };
        self.advance(&mut state, WorkerState::RendererAcquired)?;

        while let Some(url) = self.next_url() {
            self.advance(&mut state, WorkerState::Extracting)?;
            self.stats.record_attempt();

            match extract(&mut **renderer, &url, &self.selectors, self.post_timeout).await {
                Extraction::Record(record) => {
                    self.stats.record_extracted();
                    self.persist(&url, &record);
                }
                Extraction::TimedOut => self.stats.record_skipped(),
                Extraction::Failed(_) => self.stats.record_failed(),
            }

            self.advance(&mut state, WorkerState::RendererAcquired)?;
        }

        drop(renderer);
        self.advance(&mut state, WorkerState::Released)?;
        Ok(())
    }

    fn next_url(&self) -> Option<String> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn queue_is_empty(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn persist(&self, url: &str, record: &PostRecord) {
        match self.storage.merge(record) {
            Ok(outcome) => {
                self.stats.record_merge(outcome.inserted, outcome.overwritten);
                tracing::debug!(
                    "Stored {} ({} new, {} overwritten, {} total)",
                    url,
                    outcome.inserted,
                    outcome.overwritten,
                    outcome.total
                );
            }
            Err(e) => {
                self.stats.record_merge_failure();
                tracing::error!("Failed to store record from {}: {}", url, e);
            }
        }
    }

    fn advance(&self, state: &mut WorkerState, next: WorkerState) -> Result<()> {
        if !state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        tracing::trace!("Worker {} {} -> {}", self.index, state, next);
        *state = next;
        Ok(())
    }
}
