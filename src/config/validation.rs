use crate::config::types::{ApiConfig, Config, CrawlConfig, RuntimeConfig};
use crate::ConfigError;
use url::Url;

const MAX_DEPTH_LIMIT: u32 = 10;
const MAX_PAGE_SIZE: u32 = 20;

/// Validates the entire configuration
///
/// Keywords and location may still be empty here since the CLI can supply
/// them; `validate_request` checks them before a crawl starts.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawl_config(&config.crawl)?;
    validate_runtime_config(&config.runtime)?;
    Ok(())
}

/// Checks everything a crawl needs before the first network call
pub fn validate_request(config: &Config) -> Result<(), ConfigError> {
    validate(config)?;

    if config.crawl.keywords.trim().is_empty() {
        return Err(ConfigError::Validation(
            "keywords cannot be empty".to_string(),
        ));
    }

    if config.crawl.location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "location cannot be empty".to_string(),
        ));
    }

    match config.api.key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingApiKey),
    }
}

/// Validates endpoint configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("places-url", &config.places_url),
        ("geocode-url", &config.geocode_url),
        ("boundary-url", &config.boundary_url),
    ] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{} must use http or https, got '{}'",
                name, value
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl tuning
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-depth must be at most {}, got {}",
            MAX_DEPTH_LIMIT, config.max_depth
        )));
    }

    if config.page_size < 1 || config.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, config.page_size
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.page_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "page-cap must be >= 1, got {}",
            config.page_cap
        )));
    }

    // The capped signal needs at least `page-cap` reachable results
    let reachable = config.page_size as usize * config.max_pages as usize;
    if reachable < config.page_cap {
        return Err(ConfigError::Validation(format!(
            "page-size × max-pages ({} × {} = {}) must be at least page-cap ({}), \
             otherwise dense cells are never subdivided",
            config.page_size, config.max_pages, reachable, config.page_cap
        )));
    }

    if config.max_results == Some(0) {
        return Err(ConfigError::Validation(
            "max-results must be >= 1 when set".to_string(),
        ));
    }

    for (name, value) in [
        ("min-cell-span", config.min_cell_span),
        ("min-viewport-span", config.min_viewport_span),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!(
                "{} must be a non-negative number of degrees, got {}",
                name, value
            )));
        }
    }

    if !config.fallback_radius_m.is_finite()
        || config.fallback_radius_m <= 0.0
        || config.fallback_radius_m > 50_000.0
    {
        return Err(ConfigError::Validation(format!(
            "fallback-radius-m must be in (0, 50000], got {}",
            config.fallback_radius_m
        )));
    }

    if let Some(name) = config.primary_types.iter().find(|t| {
        !t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }) {
        return Err(ConfigError::Validation(format!(
            "primary-types entries must be lowercase place type names, got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates runtime limits
fn validate_runtime_config(config: &RuntimeConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 64, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be at most 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}
