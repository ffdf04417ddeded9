//! Configuration module for Slot-Watch
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so a missing file is fine.
//!
//! # Example
//!
//! ```no_run
//! use slot_watch::config::load_config_or_default;
//! use std::path::Path;
//!
//! let config = load_config_or_default(Path::new("slot-watch.toml")).unwrap();
//! println!("Polling every {}s", config.watch.interval_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, HttpConfig, NotifyConfig, StorageConfig, UnknownPolicy,
    WatchConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::{validate_target_name, validate_target_url, validate_webhook_url};
