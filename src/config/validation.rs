use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RendererConfig, SelectorConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selector_config(&config.selectors)?;
    validate_crawler_config(&config.crawler)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("origin", &config.origin)?;
    validate_http_url("start-url", &config.start_url)?;

    if !config.post_path_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "post-path-prefix must start with '/', got '{}'",
            config.post_path_prefix
        )));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Every selector must compile
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.listing_marker,
        &config.listing_row,
        &config.next_page,
        &config.post_marker,
        &config.post_time,
        &config.post_body,
        &config.comment_block,
        &config.comment_time,
        &config.comment_text,
    ] {
        compile_selector(selector)?;
    }
    Ok(())
}

/// Compiles a CSS selector, mapping failures into a configuration error
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 64, got {}",
            config.max_workers
        )));
    }

    if config.listing_timeout_secs < 1 || config.post_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "element wait timeouts must be >= 1s, got listing={}s post={}s",
            config.listing_timeout_secs, config.post_timeout_secs
        )));
    }

    if config.min_page_delay_ms > config.max_page_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-page-delay-ms ({}) must not exceed max-page-delay-ms ({})",
            config.min_page_delay_ms, config.max_page_delay_ms
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates renderer identities
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must list at least one identity".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.store_path.is_empty() {
        return Err(ConfigError::Validation(
            "store-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
