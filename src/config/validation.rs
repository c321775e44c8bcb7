use crate::config::types::{Config, CrawlConfig, FetchConfig, OutputConfig, RenderConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_render_config(&config.render)?;
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be between 1 and timeout-secs ({}), got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.page_timeout_secs < 1 || config.page_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "page-timeout-secs must be between 1 and 300, got {}",
            config.page_timeout_secs
        )));
    }

    if let Some(path) = &config.chrome_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chrome-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    if config.request_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "request-delay-ms must be at most 60000, got {}",
            config.request_delay_ms
        )));
    }

    if config.sitemap_max_depth < 1 || config.sitemap_max_depth > 10 {
        return Err(ConfigError::Validation(format!(
            "sitemap-max-depth must be between 1 and 10, got {}",
            config.sitemap_max_depth
        )));
    }

    if config.progress_buffer < 1 {
        return Err(ConfigError::Validation(
            "progress-buffer must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_dir.is_empty() {
        return Err(ConfigError::Validation(
            "download-dir cannot be empty".to_string(),
        ));
    }

    if !config.download_url_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "download-url-prefix must start with '/', got '{}'",
            config.download_url_prefix
        )));
    }

    if let Some(path) = &config.database_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "database-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}
