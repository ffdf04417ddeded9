//! Slot-Watch: a TestFlight invite-slot watcher
//!
//! This crate polls a set of named TestFlight public-invite pages, classifies each
//! page into a slot state, and posts a Discord notification when a slot opens or
//! closes. Per-target state survives restarts through a small JSON store.

pub mod classifier;
pub mod config;
pub mod notify;
pub mod state;
pub mod storage;
pub mod supervisor;
pub mod watcher;

use thiserror::Error;

/// Main error type for Slot-Watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Slot-Watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use classifier::{classify, Classifier};
pub use config::Config;
pub use state::{SlotState, Target, TargetMap, Transition};
pub use storage::{JsonStore, TargetStore};
pub use watcher::{TransitionEngine, Watcher};
