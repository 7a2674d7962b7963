//! Harvest statistics
//!
//! Counters are plain atomics so every worker can record into one shared
//! [`HarvestStats`] without locking.

use crate::render::ReleaseReport;
use crate::state::DiscoveryOutcome;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters shared by all post workers
#[derive(Debug, Default)]
pub struct HarvestStats {
    attempted: AtomicUsize,
    records: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    merged: AtomicUsize,
    merge_failures: AtomicUsize,
    entries_inserted: AtomicUsize,
    entries_overwritten: AtomicUsize,
    lost_workers: AtomicUsize,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A post URL was handed to an extractor
    pub fn record_attempt(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Extraction produced a record
    pub fn record_extracted(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    /// The post marker never appeared
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Navigation or document retrieval failed
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merge(&self, inserted: usize, overwritten: usize) {
        self.merged.fetch_add(1, Ordering::Relaxed);
        self.entries_inserted.fetch_add(inserted, Ordering::Relaxed);
        self.entries_overwritten.fetch_add(overwritten, Ordering::Relaxed);
    }

    pub fn record_merge_failure(&self) {
        self.merge_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker stopped because its renderer could not be launched
    pub fn record_lost_worker(&self) {
        self.lost_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempted(&self) -> usize {
        self.attempted.load(Ordering::Relaxed)
    }

    /// Freezes the counters into a report
    pub fn report(&self, unprocessed: usize, release: ReleaseReport) -> FetchReport {
        FetchReport {
            attempted: self.attempted.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            merged: self.merged.load(Ordering::Relaxed),
            merge_failures: self.merge_failures.load(Ordering::Relaxed),
            entries_inserted: self.entries_inserted.load(Ordering::Relaxed),
            entries_overwritten: self.entries_overwritten.load(Ordering::Relaxed),
            lost_workers: self.lost_workers.load(Ordering::Relaxed),
            unprocessed,
            release,
        }
    }
}

/// What the fetch phase did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Post URLs handed to an extractor
    pub attempted: usize,

    /// Extractions that produced a record
    pub records: usize,

    /// Posts whose marker element never appeared
    pub skipped: usize,

    /// Posts that failed to load or read
    pub failed: usize,

    /// Records merged into the store
    pub merged: usize,

    /// Records the store refused
    pub merge_failures: usize,

    /// Keys new to the store
    pub entries_inserted: usize,

    /// Keys whose stored text was replaced
    pub entries_overwritten: usize,

    /// Workers that stopped because their renderer failed to launch
    pub lost_workers: usize,

    /// URLs left in the queue because no worker could take them
    pub unprocessed: usize,

    pub release: ReleaseReport,
}

/// End-of-run summary
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Listing pages rendered and parsed
    pub pages_visited: u32,

    /// Post links found across all listing pages
    pub links_found: usize,

    /// Why discovery stopped
    pub outcome: DiscoveryOutcome,

    pub fetch: FetchReport,

    /// Key count of the store after the run, if it could be read
    pub store_entries: Option<usize>,
}

impl HarvestSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    let fetch = &summary.fetch;

    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Started:  {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    println!();

    println!("Discovery:");
    println!("  Listing pages visited: {}", summary.pages_visited);
    println!("  Post links found: {}", summary.links_found);
    println!("  Stopped because: {}", describe_outcome(summary.outcome));
    println!();

    println!("Posts:");
    println!("  Attempted: {}", fetch.attempted);
    println!("  Extracted: {}", fetch.records);
    println!("  Skipped (timed out): {}", fetch.skipped);
    println!("  Failed: {}", fetch.failed);
    if fetch.unprocessed > 0 {
        println!("  Left unprocessed: {}", fetch.unprocessed);
    }
    println!();

    println!("Store:");
    println!("  Merges: {} ({} failed)", fetch.merged, fetch.merge_failures);
    println!(
        "  Entries: {} new, {} overwritten",
        fetch.entries_inserted, fetch.entries_overwritten
    );
    match summary.store_entries {
        Some(total) => println!("  Total entries: {}", total),
        None => println!("  Total entries: unavailable"),
    }
    println!();

    println!("Renderers:");
    println!(
        "  Closed: {}, close errors: {}, idle slots: {}",
        fetch.release.closed, fetch.release.close_errors, fetch.release.skipped
    );
    if fetch.lost_workers > 0 {
        println!("  Workers lost to launch failures: {}", fetch.lost_workers);
    }

    let success_rate = if fetch.attempted > 0 {
        (fetch.records as f64 / fetch.attempted as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "\nSuccess Rate: {:.1}% ({} / {} posts extracted)",
        success_rate, fetch.records, fetch.attempted
    );
}

fn describe_outcome(outcome: DiscoveryOutcome) -> &'static str {
    match outcome {
        DiscoveryOutcome::Exhausted => "page limit reached",
        DiscoveryOutcome::TimedOut => "listing page timed out",
        DiscoveryOutcome::NoNextPage => "no next page",
    }
}
