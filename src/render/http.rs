//! Static HTTP renderer
//!
//! This backend performs one GET per navigation and keeps the response body as
//! the current document. There is no script execution, so a marker element
//! either exists in the fetched markup or never will: waits are answered
//! immediately.

use crate::render::{Identity, RenderError, RenderResult, Renderer, RendererFactory};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Builds an HTTP client presenting the given user agent
///
/// # Example
///
/// ```no_run
/// use forum_harvest::render::build_http_client;
///
/// let client = build_http_client("Mozilla/5.0 (X11; Linux x86_64)").unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Launches [`HttpRenderer`]s
#[derive(Debug, Default)]
pub struct HttpRendererFactory;

impl HttpRendererFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RendererFactory for HttpRendererFactory {
    async fn launch(&self, identity: Identity) -> RenderResult<Box<dyn Renderer>> {
        let client = build_http_client(&identity.user_agent)
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        tracing::debug!("Launched HTTP renderer {}", identity.label);
        Ok(Box::new(HttpRenderer {
            client,
            label: identity.label,
            document: None,
        }))
    }
}

/// Renderer backed by a reqwest client
pub struct HttpRenderer {
    client: Client,
    label: String,
    document: Option<String>,
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn navigate(&mut self, url: &str) -> RenderResult<()> {
        self.document = None;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: classify_request_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.document = Some(body);
        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> RenderResult<()> {
        let document = self
            .document
            .as_deref()
            .ok_or_else(|| RenderError::Document("no page loaded".to_string()))?;

        if document_contains(document, selector)? {
            Ok(())
        } else {
            Err(RenderError::Timeout {
                selector: selector.to_string(),
                waited: timeout,
            })
        }
    }

    async fn current_document(&mut self) -> RenderResult<String> {
        self.document
            .clone()
            .ok_or_else(|| RenderError::Document("no page loaded".to_string()))
    }

    async fn close(&mut self) -> RenderResult<()> {
        self.document = None;
        tracing::debug!("Closed HTTP renderer {}", self.label);
        Ok(())
    }
}

/// Checks whether `html` contains an element matching `selector`
pub(crate) fn document_contains(html: &str, selector: &str) -> RenderResult<bool> {
    let selector =
        Selector::parse(selector).map_err(|_| RenderError::InvalidSelector(selector.to_string()))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

fn classify_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    }
}
