//! HTML parsing for listing and post pages
//!
//! Parsing is total. Every field lookup falls back to a named placeholder
//! when its element is missing, so a page that rendered at all always yields
//! a record.

use crate::config::{compile_selector, SelectorConfig};
use crate::record::PostRecord;
use crate::url::resolve_post_link;
use crate::ConfigResult;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Key used when a body or comment has no displayed time
pub const UNKNOWN_TIME: &str = "Unknown";

/// Body text used when the post body element is missing
pub const NO_CONTENT: &str = "No content";

/// Comment text used when a comment block has no text element
pub const NO_COMMENT: &str = "No comment";

/// Compiled selectors for both page kinds
///
/// The marker selectors stay as strings: they are handed to a renderer's
/// element wait rather than matched locally.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub listing_marker: String,
    pub post_marker: String,
    listing_row: Selector,
    row_link: Selector,
    next_page: Selector,
    post_time: Selector,
    post_body: Selector,
    comment_block: Selector,
    comment_time: Selector,
    comment_text: Selector,
}

impl PageSelectors {
    pub fn compile(config: &SelectorConfig) -> ConfigResult<Self> {
        compile_selector(&config.listing_marker)?;
        compile_selector(&config.post_marker)?;

        Ok(Self {
            listing_marker: config.listing_marker.clone(),
            post_marker: config.post_marker.clone(),
            listing_row: compile_selector(&config.listing_row)?,
            row_link: compile_selector("a[href]")?,
            next_page: compile_selector(&config.next_page)?,
            post_time: compile_selector(&config.post_time)?,
            post_body: compile_selector(&config.post_body)?,
            comment_block: compile_selector(&config.comment_block)?,
            comment_time: compile_selector(&config.comment_time)?,
            comment_text: compile_selector(&config.comment_text)?,
        })
    }
}

/// What one listing page contributes to discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute post URLs, in row order
    pub post_links: Vec<String>,

    /// Raw href of the next-page control, if the page has one
    pub next_href: Option<String>,
}

/// Extracts post links and the next-page href from listing markup
///
/// Only the first anchor with an `href` in each row is considered, and only
/// if its target starts with `post_prefix`.
pub fn parse_listing(
    html: &str,
    selectors: &PageSelectors,
    origin: &Url,
    post_prefix: &str,
) -> ListingPage {
    let document = Html::parse_document(html);

    let post_links = document
        .select(&selectors.listing_row)
        .filter_map(|row| row.select(&selectors.row_link).next())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_post_link(origin, href, post_prefix))
        .collect();

    let next_href = document
        .select(&selectors.next_page)
        .find_map(|control| control.value().attr("href"))
        .map(|href| href.to_string());

    ListingPage {
        post_links,
        next_href,
    }
}

/// Extracts the body and comments of a post page
///
/// The body is inserted first, keyed by its displayed time. Comments follow
/// in document order, each keyed by its own time; a comment whose time equals
/// an earlier key replaces that entry's text.
pub fn parse_post(html: &str, selectors: &PageSelectors) -> PostRecord {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut record = PostRecord::new();

    let body_time = first_text(root, &selectors.post_time).unwrap_or_else(|| UNKNOWN_TIME.into());
    let body_text = first_text(root, &selectors.post_body).unwrap_or_else(|| NO_CONTENT.into());
    record.insert(body_time, body_text);

    for block in document.select(&selectors.comment_block) {
        let time = first_text(block, &selectors.comment_time).unwrap_or_else(|| UNKNOWN_TIME.into());
        let text = first_text(block, &selectors.comment_text).unwrap_or_else(|| NO_COMMENT.into());
        if let Some(previous) = record.insert(time, text) {
            tracing::trace!("Comment time collided, replaced '{}'", previous);
        }
    }

    record
}

/// Trimmed text content of the first match of `selector` under `scope`
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}
