use crate::config::NextPagePolicy;
use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute http(s) URL
///
/// # Examples
///
/// ```
/// use forum_harvest::url::parse_http_url;
///
/// let url = parse_http_url("https://guba.eastmoney.com/list,1.html").unwrap();
/// assert_eq!(url.host_str(), Some("guba.eastmoney.com"));
/// assert!(parse_http_url("/news,1.html").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => UrlError::NotAbsolute(url_str.to_string()),
        other => UrlError::Parse(other.to_string()),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Resolves a listing-row href into an absolute post URL
///
/// Returns `None` unless the href is a path starting with `post_prefix`.
/// Absolute hrefs pointing elsewhere are not post links.
///
/// # Examples
///
/// ```
/// use forum_harvest::url::resolve_post_link;
/// use url::Url;
///
/// let origin = Url::parse("https://guba.eastmoney.com").unwrap();
/// assert_eq!(
///     resolve_post_link(&origin, "/news,zssh000001,1.html", "/news").as_deref(),
///     Some("https://guba.eastmoney.com/news,zssh000001,1.html")
/// );
/// assert_eq!(resolve_post_link(&origin, "/list,zssh000001.html", "/news"), None);
/// ```
pub fn resolve_post_link(origin: &Url, href: &str, post_prefix: &str) -> Option<String> {
    let href = href.trim();
    if !href.starts_with(post_prefix) {
        return None;
    }

    origin.join(href).ok().map(String::from)
}

/// Resolves the href of a next-page control into the next listing URL
///
/// # Arguments
///
/// * `href` - The raw `href` attribute value
/// * `origin` - The site origin
/// * `policy` - Whether the href is already absolute or must be origin-prefixed
pub fn resolve_next_page(href: &str, origin: &Url, policy: NextPagePolicy) -> UrlResult<Url> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Parse("empty next-page href".to_string()));
    }

    match policy {
        NextPagePolicy::Literal => parse_http_url(href),
        NextPagePolicy::OriginPrefixed => origin
            .join(href)
            .map_err(|e| UrlError::Parse(format!("{}: {}", href, e))),
    }
}
