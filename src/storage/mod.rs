//! Storage module for persisting targets
//!
//! This module handles the durable copy of every monitored target, including:
//! - Loading the target map, recovering from a missing or unparseable file
//! - Atomic full-overwrite saves after each poll cycle
//! - Adding and removing targets with validation

mod json;
mod traits;

pub use json::JsonStore;
pub use traits::{StorageError, StorageResult, TargetStore};

use crate::config::{validate_target_name, validate_target_url};
use crate::state::Target;
use crate::WatchError;

use std::path::Path;

/// Opens the JSON store at `path`, failing if it cannot be written
///
/// # Returns
///
/// * `Ok(JsonStore)` - Store exists (possibly freshly created) and is writable
/// * `Err(StorageError)` - The location is not writable
pub fn open_store(path: &Path) -> StorageResult<JsonStore> {
    JsonStore::open(path)
}

/// Adds a target (or replaces the URL of an existing one) and persists the map
///
/// A replaced target starts over as never-classified.
///
/// # Returns
///
/// The target that was replaced, if the name already existed
pub fn add_target<S: TargetStore>(
    store: &S,
    name: &str,
    url: &str,
    url_prefix: &str,
) -> Result<Option<Target>, WatchError> {
    let name = name.trim();
    let url = url.trim();

    validate_target_name(name).map_err(|e| WatchError::InvalidTarget(e.to_string()))?;
    validate_target_url(url, url_prefix).map_err(|e| WatchError::InvalidTarget(e.to_string()))?;

    let mut targets = store.try_load()?;
    let replaced = targets.insert(Target::new(name, url));
    store.save(&targets)?;

    match &replaced {
        Some(_) => tracing::info!("Target '{}' updated", name),
        None => tracing::info!("Target '{}' added", name),
    }
    Ok(replaced)
}

/// Removes a target by name and persists the map
pub fn remove_target<S: TargetStore>(store: &S, name: &str) -> Result<Target, WatchError> {
    let mut targets = store.try_load()?;
    let removed = targets
        .remove(name)
        .ok_or_else(|| WatchError::TargetNotFound(name.to_string()))?;
    store.save(&targets)?;

    tracing::info!("Target '{}' removed", name);
    Ok(removed)
}
