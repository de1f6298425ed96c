use crate::config::types::{
    ChunkingConfig, Config, CrawlerConfig, QueueConfig, StorageConfig, MAX_DELAY_SECS,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_queue_config(&config.queues)?;
    validate_chunking_config(&config.chunking)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if !config.delay.is_finite() || config.delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            config.delay
        )));
    }

    if config.delay > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "delay must be at most {} seconds, got {}",
            MAX_DELAY_SECS, config.delay
        )));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "timeout must be at least 1 second".to_string(),
        ));
    }

    if config.max_content_size == 0 {
        return Err(ConfigError::Validation(
            "max_content_size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates store configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    for (name, ttl) in [
        ("url_ttl", config.url_ttl),
        ("robots_ttl", config.robots_ttl),
        ("content_ttl", config.content_ttl),
    ] {
        if ttl == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be greater than 0",
                name
            )));
        }
    }

    Ok(())
}

/// Validates queue names
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    for name in config.names() {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "queue names cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates chunking configuration
fn validate_chunking_config(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if config.max_chunk_size == 0 {
        return Err(ConfigError::Validation(
            "max_chunk_size must be greater than 0".to_string(),
        ));
    }

    if config.overlap_size >= config.max_chunk_size {
        return Err(ConfigError::Validation(format!(
            "overlap_size ({}) must be smaller than max_chunk_size ({})",
            config.overlap_size, config.max_chunk_size
        )));
    }

    Ok(())
}
