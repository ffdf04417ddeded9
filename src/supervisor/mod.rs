//! Process supervision
//!
//! The watcher itself only knows how to run until told to stop. Keeping a
//! single instance alive, restarting it after a crash, or reloading its
//! environment is the job of an external supervisor behind this trait.

mod pm2;

pub use pm2::Pm2;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a supervisor backend
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{0} is not installed or not on PATH")]
    NotInstalled(String),

    #[error("`{command}` failed (exit code {status:?}): {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Could not parse supervisor output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Starts, stops and inspects a named long-running process
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Starts `command` under `name`, replacing a previous instance if the
    /// backend enforces a single instance
    async fn start(&self, name: &str, command: &[String]) -> Result<(), SupervisorError>;

    async fn stop(&self, name: &str) -> Result<(), SupervisorError>;

    /// Restarts `name`, picking up the current environment
    async fn restart(&self, name: &str) -> Result<(), SupervisorError>;

    async fn is_running(&self, name: &str) -> Result<bool, SupervisorError>;
}
