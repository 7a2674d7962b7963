//! Page rendering for Forum-Harvest
//!
//! A [`Renderer`] loads a URL, waits for a marker element to appear and hands
//! back the current markup. Renderers are launched by a [`RendererFactory`]
//! with an [`Identity`], and post workers get theirs from a [`RendererPool`].
//!
//! Two backends exist:
//! - `chrome`: headless Chromium over the DevTools protocol
//! - `http`: a plain GET per navigation, for server-rendered pages

mod chrome;
#[cfg(test)]
pub(crate) mod fixtures;
mod http;
mod pool;

pub use chrome::ChromeRendererFactory;
pub use http::{build_http_client, HttpRendererFactory};
pub use pool::{ReleaseReport, RendererLease, RendererPool};

use crate::config::{RendererBackend, RendererConfig};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by renderers
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Element '{selector}' did not appear within {waited:?}")]
    Timeout { selector: String, waited: Duration },

    #[error("Failed to read document: {0}")]
    Document(String),

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("Failed to close renderer: {0}")]
    Close(String),
}

impl RenderError {
    /// Returns true for a bounded wait that ran out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// The request identity a renderer presents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User-agent string sent with every request
    pub user_agent: String,

    /// Short name used for logs and per-renderer scratch directories
    pub label: String,
}

impl Identity {
    pub fn new(user_agent: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            label: label.into(),
        }
    }

    /// Picks one of `user_agents` at random
    ///
    /// Falls back to the first built-in identity if the list is empty.
    pub fn random(user_agents: &[String], label: impl Into<String>) -> Self {
        let user_agent = user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| crate::config::DEFAULT_USER_AGENTS[0].to_string());
        Self::new(user_agent, label)
    }
}

/// A live page renderer owned by exactly one task
#[async_trait]
pub trait Renderer: Send {
    /// Loads `url`, replacing the current document
    async fn navigate(&mut self, url: &str) -> RenderResult<()>;

    /// Waits until an element matching `selector` exists, up to `timeout`
    ///
    /// Returns [`RenderError::Timeout`] when the bound is exceeded.
    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> RenderResult<()>;

    /// Returns the markup of the current document
    async fn current_document(&mut self) -> RenderResult<String>;

    /// Shuts the renderer down; the renderer must not be used afterwards
    async fn close(&mut self) -> RenderResult<()>;
}

/// Launches renderers
#[async_trait]
pub trait RendererFactory: Send + Sync {
    async fn launch(&self, identity: Identity) -> RenderResult<Box<dyn Renderer>>;
}

/// Builds the factory selected by the renderer configuration
pub fn build_factory(config: &RendererConfig) -> Arc<dyn RendererFactory> {
    match config.backend {
        RendererBackend::Chrome => Arc::new(ChromeRendererFactory::from_config(config)),
        RendererBackend::Http => Arc::new(HttpRendererFactory::new()),
    }
}
