//! Post extraction
//!
//! Renders one post page and turns it into a [`PostRecord`]. Failures are
//! contained here: a post that does not render in time, or whose page cannot
//! be loaded or read, yields no record and never affects other posts.

use crate::crawler::parser::{parse_post, PageSelectors};
use crate::record::PostRecord;
use crate::render::{RenderError, Renderer};
use std::time::Duration;

/// Result of extracting one post
#[derive(Debug)]
pub enum Extraction {
    Record(PostRecord),
    /// The post marker did not appear within the timeout
    TimedOut,
    /// Navigation or document retrieval failed
    Failed(RenderError),
}

impl Extraction {
    pub fn into_record(self) -> Option<PostRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::TimedOut | Self::Failed(_) => None,
        }
    }
}

/// Renders `url` and extracts its record, classifying any failure
pub async fn extract(
    renderer: &mut dyn Renderer,
    url: &str,
    selectors: &PageSelectors,
    timeout: Duration,
) -> Extraction {
    if let Err(e) = renderer.navigate(url).await {
        tracing::warn!("Failed to load post {}: {}", url, e);
        return Extraction::Failed(e);
    }

    match renderer
        .wait_for_element(&selectors.post_marker, timeout)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            tracing::warn!("Post {} timed out, skipping: {}", url, e);
            return Extraction::TimedOut;
        }
        Err(e) => {
            tracing::warn!("Error waiting for post {}: {}", url, e);
            return Extraction::Failed(e);
        }
    }

    let html = match renderer.current_document().await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Failed to read post {}: {}", url, e);
            return Extraction::Failed(e);
        }
    };

    let record = parse_post(&html, selectors);
    tracing::debug!("Extracted {} entries from {}", record.len(), url);
    Extraction::Record(record)
}

/// Renders `url` and extracts its record, or `None` if the post was skipped
pub async fn extract_post(
    renderer: &mut dyn Renderer,
    url: &str,
    selectors: &PageSelectors,
    timeout: Duration,
) -> Option<PostRecord> {
    extract(renderer, url, selectors, timeout).await.into_record()
}
