//! Monitored targets and the ordered map that holds them

use crate::state::{SlotState, Transition};
use chrono::{DateTime, Utc};

/// A monitored TestFlight program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Unique, non-empty identifier
    pub name: String,

    /// Public invite URL
    pub url: String,

    /// Last classified state; `None` until the first successful classification
    pub state: Option<SlotState>,

    /// When a notification for this target was last delivered
    pub last_notified_at: Option<DateTime<Utc>>,

    /// A transition whose notification could not be delivered yet
    pub pending: Option<Transition>,

    /// Last `Available` or `Full` classification, ignoring `Unknown`
    pub last_definite_state: Option<SlotState>,
}

impl Target {
    /// Creates a target that has never been classified nor notified
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            state: None,
            last_notified_at: None,
            pending: None,
            last_definite_state: None,
        }
    }

    /// The stored state, with "never classified" read as `Unknown`
    pub fn current_state(&self) -> SlotState {
        self.state.unwrap_or(SlotState::Unknown)
    }

    /// Records a classification result
    pub fn record_state(&mut self, state: SlotState) {
        self.state = Some(state);
        if state.is_definite() {
            self.last_definite_state = Some(state);
        }
    }

    /// Records a successfully delivered notification
    pub fn record_notification(&mut self, at: DateTime<Utc>) {
        self.last_notified_at = Some(at);
        self.pending = None;
    }
}

/// Insertion-ordered collection of targets keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMap {
    targets: Vec<Target>,
}

impl TargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts a target, replacing (in place) any target with the same name
    ///
    /// Returns the replaced target, if any.
    pub fn insert(&mut self, target: Target) -> Option<Target> {
        match self.targets.iter_mut().find(|t| t.name == target.name) {
            Some(existing) => Some(std::mem::replace(existing, target)),
            None => {
                self.targets.push(target);
                None
            }
        }
    }

    /// Removes a target by name, preserving the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Target> {
        let index = self.targets.iter().position(|t| t.name == name)?;
        Some(self.targets.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.targets.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<Target> {
        self.targets
    }
}

impl FromIterator<Target> for TargetMap {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        let mut map = Self::new();
        for target in iter {
            map.insert(target);
        }
        map
    }
}

impl IntoIterator for TargetMap {
    type Item = Target;
    type IntoIter = std::vec::IntoIter<Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}
