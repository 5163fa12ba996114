use crate::config::types::{
    Config, CrawlerConfig, CurationConfig, ExtractionConfig, OutputConfig, UserAgentConfig,
};
use crate::extractor::DiscoveryMethod;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Upper bound on concurrent fetch workers
const MAX_WORKERS: usize = 64;

/// Upper bound on transient-failure retries
const MAX_RETRIES: u32 = 10;

/// Smallest chunk handed to the record extractor
const MIN_CHUNK_SIZE: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_curation_config(&config.curation)?;
    validate_extraction_config(&config.extraction)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    for name in &config.disabled_strategies {
        match name.parse::<DiscoveryMethod>() {
            Ok(DiscoveryMethod::Seed) | Err(_) => {
                return Err(ConfigError::Validation(format!(
                    "disabled_strategies contains unknown strategy '{}'",
                    name
                )));
            }
            Ok(_) => {}
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.ledger_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "ledger_dir cannot be empty".to_string(),
        ));
    }

    if config.content_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "content_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every curation pattern compiles
fn validate_curation_config(config: &CurationConfig) -> Result<(), ConfigError> {
    for pattern in config.keep.iter().chain(config.skip.iter()) {
        Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.chunk_size < MIN_CHUNK_SIZE {
        return Err(ConfigError::Validation(format!(
            "chunk_size must be >= {}, got {}",
            MIN_CHUNK_SIZE, config.chunk_size
        )));
    }
    Ok(())
}

/// Validates an email address (basic validation)
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let (local, domain) = email.split_once('@').ok_or_else(|| {
        ConfigError::Validation(format!("Invalid email address '{}': missing @", email))
    })?;

    if local.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email address '{}'",
            email
        )));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email address '{}': domain must contain a dot",
            email
        )));
    }

    Ok(())
}
