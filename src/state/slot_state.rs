/// Slot state definitions for TestFlight invite pages
///
/// This module defines the states a classified page can be in, and the two
/// transitions between them that are worth telling anyone about.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the invite-slot state derived from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// The page could not be classified
    Unknown,

    /// The page offers a join button: slots are open
    Available,

    /// The page says the beta is full or closed to new testers
    Full,
}

impl SlotState {
    /// Returns true for `Available` and `Full`
    pub fn is_definite(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Lowercase name, as written to the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Available => "available",
            Self::Full => "full",
        }
    }
}

impl Default for SlotState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notify-worthy change of slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Anything that was not `Available` became `Available`
    Opened,

    /// `Available` became `Full`
    Closed,
}

impl Transition {
    /// Derives the transition between two states, if any is notify-worthy
    ///
    /// | previous      | new         | transition |
    /// |---------------|-------------|------------|
    /// | not Available | Available   | Opened     |
    /// | Available     | Full        | Closed     |
    /// | anything else |             | None       |
    pub fn between(previous: SlotState, new: SlotState) -> Option<Self> {
        match (previous, new) {
            (SlotState::Available, SlotState::Available) => None,
            (_, SlotState::Available) => Some(Self::Opened),
            (SlotState::Available, SlotState::Full) => Some(Self::Closed),
            _ => None,
        }
    }

    /// The state a target is in once this transition has happened
    pub fn destination(&self) -> SlotState {
        match self {
            Self::Opened => SlotState::Available,
            Self::Closed => SlotState::Full,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
