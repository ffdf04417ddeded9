//! Classification rules
//!
//! A rule inspects page text and either yields a state or passes. Rules are
//! evaluated in order and the first one that matches decides.

use crate::state::SlotState;

/// Join button text shown when a beta has open slots
pub const VIEW_IN_TESTFLIGHT: &str = "View in TestFlight";

/// Footer link text present on every invite page
pub const TESTING_APPS: &str = "Testing Apps with TestFlight";

pub const BETA_FULL: &str = "This beta is full";
pub const NOT_ACCEPTING: &str = "This beta isn't accepting any new testers";

/// A single classification rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Matches when both markers are present; the state depends on which
    /// appears first
    Precedence {
        first: String,
        second: String,
        /// State when `first` occurs strictly before `second`
        when_before: SlotState,
        /// State otherwise
        when_after: SlotState,
    },

    /// Matches when any of the markers is present
    AnyOf {
        markers: Vec<String>,
        state: SlotState,
    },
}

impl Rule {
    pub fn precedence(
        first: impl Into<String>,
        second: impl Into<String>,
        when_before: SlotState,
        when_after: SlotState,
    ) -> Self {
        Self::Precedence {
            first: first.into(),
            second: second.into(),
            when_before,
            when_after,
        }
    }

    pub fn any_of<I, S>(markers: I, state: SlotState) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf {
            markers: markers.into_iter().map(Into::into).collect(),
            state,
        }
    }

    /// Applies this rule to page text
    pub fn evaluate(&self, text: &str) -> Option<SlotState> {
        match self {
            Self::Precedence {
                first,
                second,
                when_before,
                when_after,
            } => {
                let first_at = text.find(first.as_str())?;
                let second_at = text.find(second.as_str())?;
                if first_at < second_at {
                    Some(*when_before)
                } else {
                    Some(*when_after)
                }
            }
            Self::AnyOf { markers, state } => markers
                .iter()
                .filter(|m| !m.is_empty())
                .any(|m| text.contains(m.as_str()))
                .then_some(*state),
        }
    }
}

/// The built-in rule table for TestFlight invite pages
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::precedence(
            VIEW_IN_TESTFLIGHT,
            TESTING_APPS,
            SlotState::Available,
            SlotState::Full,
        ),
        Rule::any_of([BETA_FULL, NOT_ACCEPTING], SlotState::Full),
    ]
}
