use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the configuration file if it exists, otherwise falls back to defaults
///
/// A file that exists but fails to parse or validate is still an error: silently
/// ignoring a typo in the cooldown would be worse than refusing to start.
pub fn load_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    load_config(path)
}
