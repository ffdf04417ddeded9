//! Watcher module for polling targets
//!
//! This module contains the core watch loop, including:
//! - HTTP fetching with a bounded timeout
//! - The per-target transition and cooldown engine
//! - Cycle scheduling, write-back and graceful shutdown

mod engine;
mod fetcher;
mod scheduler;

pub use engine::{Decision, DeliveryOutcome, TransitionEngine};
pub use fetcher::{build_http_client, fetch_page, FetchError};
pub use scheduler::{shutdown_signal, CheckOutcome, CycleReport, Watcher};

use crate::config::Config;
use crate::WatchError;

/// Runs the watcher until SIGINT or SIGTERM
///
/// This is the long-running entry point. It will:
/// 1. Open the target store (failing if it cannot be written)
/// 2. Build the HTTP client and the webhook notifier
/// 3. Poll every target once per interval
/// 4. On a termination signal, finish the current cycle, persist, and return
pub async fn watch(config: &Config) -> Result<(), WatchError> {
    let watcher = Watcher::from_config(config)?;
    watcher.run(shutdown_signal()).await
}
