//! In-memory renderer serving fixed markup, for unit tests

use crate::render::http::document_contains;
use crate::render::{Identity, RenderError, RenderResult, Renderer, RendererFactory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A fake site: URL -> markup. Unknown URLs fail to navigate.
#[derive(Default)]
pub(crate) struct StaticSite {
    pages: Arc<HashMap<String, String>>,
    launches: AtomicUsize,
    closes: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
    identities: Mutex<Vec<Identity>>,
    fail_launch: bool,
    /// Only launches for this identity label fail, after a delay
    fail_label: Option<(String, Duration)>,
}

impl StaticSite {
    pub(crate) fn new(pages: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    /// Serves `pages`, but the launch for `label` fails after `delay`
    pub(crate) fn failing_for(
        pages: impl IntoIterator<Item = (String, String)>,
        label: &str,
        delay: Duration,
    ) -> Self {
        Self {
            fail_label: Some((label.to_string(), delay)),
            ..Self::new(pages)
        }
    }

    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub(crate) fn identities(&self) -> Vec<Identity> {
        self.identities.lock().unwrap().clone()
    }
}

#[async_trait]
impl RendererFactory for StaticSite {
    async fn launch(&self, identity: Identity) -> RenderResult<Box<dyn Renderer>> {
        if self.fail_launch {
            return Err(RenderError::Launch("browser binary not found".to_string()));
        }
        if let Some((label, delay)) = &self.fail_label {
            if *label == identity.label {
                tokio::time::sleep(*delay).await;
                return Err(RenderError::Launch(format!("{} crashed on startup", label)));
            }
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.identities.lock().unwrap().push(identity);
        Ok(Box::new(StaticRenderer {
            pages: Arc::clone(&self.pages),
            closes: Arc::clone(&self.closes),
            visited: Arc::clone(&self.visited),
            current: None,
        }))
    }
}

struct StaticRenderer {
    pages: Arc<HashMap<String, String>>,
    closes: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
    current: Option<String>,
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn navigate(&mut self, url: &str) -> RenderResult<()> {
        self.visited.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => {
                self.current = None;
                Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: "not found".to_string(),
                })
            }
        }
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> RenderResult<()> {
        let html = self
            .current
            .as_deref()
            .ok_or_else(|| RenderError::Document("no page loaded".to_string()))?;
        if document_contains(html, selector)? {
            Ok(())
        } else {
            Err(RenderError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            })
        }
    }

    async fn current_document(&mut self) -> RenderResult<String> {
        self.current
            .clone()
            .ok_or_else(|| RenderError::Document("no page loaded".to_string()))
    }

    async fn close(&mut self) -> RenderResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
