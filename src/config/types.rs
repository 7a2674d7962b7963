use serde::Deserialize;
use std::time::Duration;

/// Identities a renderer may present; one is picked at random per launch
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
];

/// Main configuration structure for Forum-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    pub crawler: CrawlerConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
}

/// The forum being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host that relative post links are resolved against
    pub origin: String,

    /// First listing page
    pub start_url: String,

    /// Only row anchors whose href starts with this prefix are post links
    pub post_path_prefix: String,

    /// How the href of the next-page control becomes the next URL
    pub next_page: NextPagePolicy,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://guba.eastmoney.com".to_string(),
            start_url: "https://guba.eastmoney.com/list,zssh000001_3127.html".to_string(),
            post_path_prefix: "/news".to_string(),
            next_page: NextPagePolicy::Literal,
        }
    }
}

/// Next-page URL resolution policy
///
/// Listing markup has been seen in two variants: one where the next-page
/// control carries an absolute URL, and one where it carries a path that must
/// be prefixed with the site origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextPagePolicy {
    /// Use the href verbatim; it must already be absolute
    #[default]
    Literal,
    /// Resolve the href against the site origin
    OriginPrefixed,
}

/// CSS selectors for the marker elements and fields of both page kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// Appears once a listing page has finished loading
    pub listing_marker: String,
    /// One row per post on a listing page
    pub listing_row: String,
    /// The "next page" control on a listing page
    pub next_page: String,
    /// Appears once a post page has finished loading
    pub post_marker: String,
    pub post_time: String,
    pub post_body: String,
    /// One block per comment on a post page
    pub comment_block: String,
    /// Looked up inside a comment block
    pub comment_time: String,
    /// Looked up inside a comment block
    pub comment_text: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_marker: ".listbody".to_string(),
            listing_row: "tr.listitem".to_string(),
            next_page: "a.nextp".to_string(),
            post_marker: ".newstext".to_string(),
            post_time: "div.time".to_string(),
            post_body: "div.newstext".to_string(),
            comment_block: "div.l1items1".to_string(),
            comment_time: "span.pubtime".to_string(),
            comment_text: "div.short_text".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of post workers, each owning one renderer
    pub max_workers: usize,

    /// Bound on the wait for the listing marker (seconds)
    pub listing_timeout_secs: u64,

    /// Bound on the wait for the post marker (seconds)
    pub post_timeout_secs: u64,

    /// Lower bound of the pause between listing pages (milliseconds)
    pub min_page_delay_ms: u64,

    /// Upper bound of the pause between listing pages (milliseconds)
    pub max_page_delay_ms: u64,

    /// Listing page cap; prompted for interactively when absent
    pub max_pages: Option<u32>,
}

impl CrawlerConfig {
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_secs(self.post_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            listing_timeout_secs: 10,
            post_timeout_secs: 10,
            min_page_delay_ms: 1000,
            max_page_delay_ms: 3000,
            max_pages: None,
        }
    }
}

/// Which renderer implementation backs the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RendererBackend {
    /// Headless Chromium over the DevTools protocol
    #[default]
    Chrome,
    /// Plain HTTP GET without script execution
    Http,
}

/// Renderer identity and launch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RendererConfig {
    pub backend: RendererBackend,

    /// Candidate user-agent strings
    pub user_agents: Vec<String>,

    /// Explicit browser binary; auto-detected when absent
    pub chrome_executable: Option<String>,

    /// Parent directory for per-renderer browser profiles (system temp dir by default)
    pub profile_root: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::Chrome,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            chrome_executable: None,
            profile_root: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the persisted store
    pub store_path: String,

    pub format: StoreFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            store_path: "guba_posts_3127.json".to_string(),
            format: StoreFormat::Json,
        }
    }
}

/// Backing format of the persisted store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StoreFormat {
    #[default]
    Json,
    Sqlite,
}
