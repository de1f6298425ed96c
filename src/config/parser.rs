use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;
use std::str::FromStr;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use crawl_digest::config::load_config;
///
/// let config = load_config(Path::new("crawl-digest.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    finish(config)
}

/// Builds the configuration used when no file is given
pub fn default_config() -> Result<Config, ConfigError> {
    finish(Config::default())
}

/// Parses TOML text into a configuration without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

fn finish(mut config: Config) -> Result<Config, ConfigError> {
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Applies `CRAWLER_*` style overrides read through `lookup`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(agent) = lookup("CRAWLER_USER_AGENT") {
        config.crawler.user_agent = agent;
    }
    if let Some(value) = lookup("CRAWLER_DELAY") {
        config.crawler.delay = parse_env("CRAWLER_DELAY", &value)?;
    }
    if let Some(value) = lookup("CRAWLER_MAX_DEPTH") {
        config.crawler.max_depth = parse_env("CRAWLER_MAX_DEPTH", &value)?;
    }
    if let Some(value) = lookup("CRAWLER_TIMEOUT") {
        config.crawler.timeout = parse_env("CRAWLER_TIMEOUT", &value)?;
    }
    if let Some(value) = lookup("MAX_CONTENT_SIZE") {
        config.crawler.max_content_size = parse_env("MAX_CONTENT_SIZE", &value)?;
    }
    if let Some(path) = lookup("CRAWL_DATABASE_PATH") {
        config.storage.database_path = path;
    }
    Ok(())
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}
