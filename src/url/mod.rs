//! URL handling module for Forum-Harvest
//!
//! This module resolves the hrefs found on listing pages: post links are
//! resolved against the site origin, and the next-page control is resolved
//! according to the configured [`NextPagePolicy`].

mod resolve;

pub use resolve::{parse_http_url, resolve_next_page, resolve_post_link};

pub use crate::config::NextPagePolicy;
