use crate::config::types::{Config, HttpConfig, NotifyConfig, StorageConfig, WatchConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_watch_config(&config.watch)?;
    validate_http_config(&config.http)?;
    validate_storage_config(&config.storage)?;
    validate_notify_config(&config.notify)?;
    Ok(())
}

fn validate_watch_config(config: &WatchConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= 1, got {}",
            config.interval_secs
        )));
    }

    if config.max_concurrent_checks < 1 || config.max_concurrent_checks > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_checks must be between 1 and 32, got {}",
            config.max_concurrent_checks
        )));
    }

    if config.cooldown_secs > i64::MAX as u64 / 1000 {
        return Err(ConfigError::Validation(format!(
            "cooldown_secs is out of range: {}",
            config.cooldown_secs
        )));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "storage path cannot be empty".to_string(),
        ));
    }

    let prefix = Url::parse(&config.url_prefix)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url_prefix: {}", e)))?;

    if prefix.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "url_prefix '{}' must use HTTPS scheme",
            config.url_prefix
        )));
    }

    Ok(())
}

fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if config.webhook_env.is_empty() {
        return Err(ConfigError::Validation(
            "webhook_env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a target name: non-empty after trimming
pub fn validate_target_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Target name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a target URL against the configured prefix
pub fn validate_target_url(url: &str, prefix: &str) -> Result<(), ConfigError> {
    if !url.starts_with(prefix) || url.len() == prefix.len() {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' must start with '{}' followed by an invite code",
            url, prefix
        )));
    }

    Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", url, e)))?;

    Ok(())
}

/// Validates the shape of a Discord webhook URL
///
/// Accepts `https://discord.com/api/webhooks/<numeric id>/<token>` where the token
/// is made of ASCII letters, digits, `_` and `-`.
pub fn validate_webhook_url(webhook_url: &str) -> Result<(), ConfigError> {
    let invalid = || {
        ConfigError::InvalidUrl(format!(
            "'{}' is not a Discord webhook URL \
             (expected https://discord.com/api/webhooks/<webhook_id>/<webhook_token>)",
            webhook_url
        ))
    };

    let url = Url::parse(webhook_url).map_err(|_| invalid())?;

    if url.scheme() != "https"
        || url.host_str() != Some("discord.com")
        || url.port().is_some()
        || url.query().is_some()
        || url.fragment().is_some()
    {
        return Err(invalid());
    }

    let segments: Vec<&str> = url.path_segments().ok_or_else(invalid)?.collect();
    match segments.as_slice() {
        ["api", "webhooks", id, token] => {
            let id_ok = !id.is_empty() && id.chars().all(|c| c.is_ascii_digit());
            let token_ok = !token.is_empty()
                && token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if id_ok && token_ok {
                Ok(())
            } else {
                Err(invalid())
            }
        }
        _ => Err(invalid()),
    }
}
