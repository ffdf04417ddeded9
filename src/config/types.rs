use serde::Deserialize;
use std::time::Duration;

/// Default user agent; TestFlight serves a stripped page to obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15";

/// Main configuration structure for Slot-Watch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchConfig,
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub classifier: ClassifierConfig,
}

/// Poll loop and notification throttling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds to sleep between two poll cycles
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Minimum seconds between two notifications for the same target (0 disables)
    #[serde(rename = "cooldown-secs")]
    pub cooldown_secs: u64,

    /// Number of targets checked at the same time within one cycle
    #[serde(rename = "max-concurrent-checks")]
    pub max_concurrent_checks: u32,

    /// How an `Unknown` classification is treated as the prior state
    #[serde(rename = "unknown-policy")]
    pub unknown_policy: UnknownPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            cooldown_secs: 300,
            max_concurrent_checks: 1,
            unknown_policy: UnknownPolicy::NotAvailable,
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }
}

/// Which stored state a new classification is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownPolicy {
    /// Compare against the stored state; `Unknown` counts as "not available"
    #[default]
    NotAvailable,

    /// Compare against the last `Available`/`Full` seen, skipping `Unknown`
    Transparent,
}

/// HTTP client settings shared by the fetcher and the notifier
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Where targets live and which URLs are accepted
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the JSON target store
    pub path: String,

    /// Every target URL must start with this prefix
    pub url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "apps_config.json".to_string(),
            url_prefix: "https://testflight.apple.com/join/".to_string(),
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NotifyConfig {
    /// Environment variable holding the Discord webhook URL
    pub webhook_env: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_env: "DISCORD_WEBHOOK_URL".to_string(),
        }
    }
}

impl NotifyConfig {
    /// Reads the webhook URL from the environment; empty values count as unset
    pub fn webhook_url(&self) -> Option<String> {
        std::env::var(&self.webhook_env)
            .ok()
            .map(|v| v.trim().trim_matches('\'').to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Extra page markers appended after the built-in classification rules
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClassifierConfig {
    pub extra_available_markers: Vec<String>,
    pub extra_full_markers: Vec<String>,
}
