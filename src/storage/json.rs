//! JSON file target store
//!
//! The file is a single JSON object keyed by target name:
//!
//! ```json
//! {
//!     "AppX": {
//!         "url": "https://testflight.apple.com/join/AbCd1234",
//!         "last_state": "available",
//!         "last_notified_at": "2024-05-01T12:00:00Z"
//!     },
//!     "AppY": "https://testflight.apple.com/join/EfGh5678"
//! }
//! ```
//!
//! Bare URL strings are the older format and are read as never-classified
//! targets; they are written back in the structured form.

use crate::state::{SlotState, Target, TargetMap, Transition};
use crate::storage::traits::{StorageError, StorageResult, TargetStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persisted form of a target, without its name (the name is the JSON key)
#[derive(Debug, Serialize, Deserialize)]
struct TargetRecord {
    url: String,

    #[serde(default)]
    last_state: Option<SlotState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_notified_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending: Option<Transition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_definite_state: Option<SlotState>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Bare(String),
    Record(TargetRecord),
}

impl StoredEntry {
    fn into_target(self, name: String) -> Target {
        match self {
            Self::Bare(url) => Target::new(name, url),
            Self::Record(record) => Target {
                name,
                url: record.url,
                state: record.last_state,
                last_notified_at: record.last_notified_at,
                pending: record.pending,
                last_definite_state: record.last_definite_state,
            },
        }
    }
}

impl From<&Target> for TargetRecord {
    fn from(target: &Target) -> Self {
        Self {
            url: target.url.clone(),
            last_state: target.state,
            last_notified_at: target.last_notified_at,
            pending: target.pending,
            last_definite_state: target.last_definite_state,
        }
    }
}

/// Why a store file could not be read as a target map
#[derive(Debug)]
enum ReadOutcome {
    Missing,
    Corrupt(String),
    /// Exists but could not be read; the content may still be valid
    Unreadable(std::io::Error),
}

/// Target store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Creates a store handle without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the store, creating it if needed, and checks it can be written
    ///
    /// Loading normalizes legacy entries and the check write persists them, so
    /// after a successful `open` the file is always in the structured form.
    ///
    /// # Returns
    ///
    /// * `Ok(JsonStore)` - The store exists and is writable
    /// * `Err(StorageError::Unwritable)` - The location cannot be written
    /// * `Err(StorageError::Unreadable)` - The store exists but cannot be read
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(path);

        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Unwritable {
                path: store.path.clone(),
                source,
            })?;
        }

        let targets = store.try_load()?;
        store
            .write_atomic(&targets)
            .map_err(|e| match e {
                StorageError::Io(source) => StorageError::Unwritable {
                    path: store.path.clone(),
                    source,
                },
                other => other,
            })?;

        tracing::debug!(
            "Opened target store {} ({} targets)",
            store.path.display(),
            targets.len()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TargetMap, ReadOutcome> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(ReadOutcome::Missing),
            Err(e) => return Err(ReadOutcome::Unreadable(e)),
        };

        if content.trim().is_empty() {
            return Ok(TargetMap::new());
        }

        parse_targets(&content).map_err(|e| ReadOutcome::Corrupt(e.to_string()))
    }

    /// First unused `<path>.corrupt-<timestamp>[-n]` name
    fn backup_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let mut attempt = 0u32;
        loop {
            let mut name = self.path.clone().into_os_string();
            name.push(format!(".corrupt-{}", stamp));
            if attempt > 0 {
                name.push(format!("-{}", attempt));
            }
            let candidate = PathBuf::from(name);
            if !candidate.exists() {
                return candidate;
            }
            attempt += 1;
        }
    }

    /// Moves an unparseable store aside so a reset never destroys the only copy
    fn quarantine(&self) -> StorageResult<PathBuf> {
        let backup = self.backup_path();
        fs::rename(&self.path, &backup).map_err(|source| StorageError::Unwritable {
            path: self.path.clone(),
            source,
        })?;
        tracing::warn!("Moved unparseable store to {}", backup.display());
        Ok(backup)
    }

    fn reset(&self) -> TargetMap {
        let empty = TargetMap::new();
        if let Err(e) = self.write_atomic(&empty) {
            tracing::error!("Failed to create store {}: {}", self.path.display(), e);
        }
        empty
    }

    /// Writes the map to a sibling temp file, then renames it over the store
    ///
    /// The temp file is removed if anything fails before the rename.
    fn write_atomic(&self, targets: &TargetMap) -> StorageResult<()> {
        let content = render_targets(targets)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl TargetStore for JsonStore {
    fn try_load(&self) -> StorageResult<TargetMap> {
        match self.read() {
            Ok(targets) => Ok(targets),
            Err(ReadOutcome::Missing) => {
                tracing::info!(
                    "Target store {} not found, creating an empty one",
                    self.path.display()
                );
                Ok(self.reset())
            }
            Err(ReadOutcome::Corrupt(reason)) => {
                tracing::warn!(
                    "Target store {} is unparseable ({}), resetting to empty",
                    self.path.display(),
                    reason
                );
                self.quarantine()?;
                Ok(self.reset())
            }
            Err(ReadOutcome::Unreadable(source)) => Err(StorageError::Unreadable {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, targets: &TargetMap) -> StorageResult<()> {
        self.write_atomic(targets)?;
        tracing::debug!(
            "Saved {} targets to {}",
            targets.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Parses store content into a target map, normalizing bare URL entries
fn parse_targets(content: &str) -> Result<TargetMap, serde_json::Error> {
    let raw: Map<String, Value> = serde_json::from_str(content)?;

    let mut targets = TargetMap::new();
    for (name, value) in raw {
        let entry: StoredEntry = serde_json::from_value(value)?;
        targets.insert(entry.into_target(name));
    }
    Ok(targets)
}

/// Renders a target map as pretty JSON with four-space indentation
fn render_targets(targets: &TargetMap) -> Result<String, serde_json::Error> {
    let mut raw = Map::new();
    for target in targets.iter() {
        raw.insert(
            target.name.clone(),
            serde_json::to_value(TargetRecord::from(target))?,
        );
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    Value::Object(raw).serialize(&mut ser)?;
    buf.push(b'\n');

    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
