//! Headless Chromium renderer
//!
//! Each renderer is a separate browser process with its own profile
//! directory, launched with automation-detection signals suppressed:
//! `--enable-automation` is never passed, the `AutomationControlled` blink
//! feature is disabled, and `navigator.webdriver` is overridden after every
//! navigation.

use crate::config::RendererConfig;
use crate::render::{Identity, RenderError, RenderResult, Renderer, RendererFactory};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Launch flags for headless stability and reduced automation fingerprinting
const CHROME_ARGS: [&str; 6] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-dev-shm-usage",
    "--log-level=3",
    "--start-maximized",
];

/// Hides the webdriver flag from page scripts
const WEBDRIVER_OVERRIDE: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined}); undefined";

/// Interval between element lookups while waiting for a marker
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches [`ChromeRenderer`]s
#[derive(Debug, Clone)]
pub struct ChromeRendererFactory {
    executable: Option<PathBuf>,
    profile_root: PathBuf,
}

impl ChromeRendererFactory {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            executable: config.chrome_executable.as_ref().map(PathBuf::from),
            profile_root: config
                .profile_root
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    fn profile_dir(&self, identity: &Identity) -> PathBuf {
        self.profile_root.join(format!(
            "forum-harvest-{}-{}",
            std::process::id(),
            identity.label
        ))
    }

    fn browser_config(&self, identity: &Identity, profile_dir: &Path) -> RenderResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .args(CHROME_ARGS)
            .arg(format!("--user-agent={}", identity.user_agent));

        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(RenderError::Launch)
    }
}

#[async_trait]
impl RendererFactory for ChromeRendererFactory {
    async fn launch(&self, identity: Identity) -> RenderResult<Box<dyn Renderer>> {
        let profile_dir = self.profile_dir(&identity);
        let config = self.browser_config(&identity, &profile_dir)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(RenderError::Launch(e.to_string()));
            }
        };

        if let Err(e) = page.evaluate(WEBDRIVER_OVERRIDE).await {
            tracing::debug!("webdriver override failed on blank page: {}", e);
        }

        tracing::info!(
            "Launched browser {} ({})",
            identity.label,
            identity.user_agent
        );

        Ok(Box::new(ChromeRenderer {
            browser,
            page,
            handler_task,
            profile_dir,
            label: identity.label,
        }))
    }
}

/// Renderer backed by one headless Chromium process
pub struct ChromeRenderer {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
    label: String,
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn navigate(&mut self, url: &str) -> RenderResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if let Err(e) = self.page.evaluate(WEBDRIVER_OVERRIDE).await {
            tracing::debug!("webdriver override failed on {}: {}", url, e);
        }

        Ok(())
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> RenderResult<()> {
        let page = &self.page;
        let found = tokio::time::timeout(timeout, async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        found.map_err(|_| RenderError::Timeout {
            selector: selector.to_string(),
            waited: timeout,
        })
    }

    async fn current_document(&mut self) -> RenderResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Document(e.to_string()))
    }

    async fn close(&mut self) -> RenderResult<()> {
        let closed = self.browser.close().await;
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                tracing::debug!("Waiting on browser {} exit failed: {}", self.label, e);
            }
        }
        self.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
            tracing::debug!(
                "Could not remove profile {}: {}",
                self.profile_dir.display(),
                e
            );
        }

        closed
            .map(|_| ())
            .map_err(|e| RenderError::Close(format!("{}: {}", self.label, e)))
    }
}
