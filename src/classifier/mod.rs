//! Page classification
//!
//! Maps the raw text of a TestFlight invite page to a [`SlotState`] using an
//! ordered rule table. Classification is pure: the same text always yields the
//! same state, and pages that match no rule are `Unknown` rather than an error.
//!
//! # Built-in rules
//!
//! 1. Both "View in TestFlight" and "Testing Apps with TestFlight" present:
//!    `Available` if the join button comes first, `Full` otherwise.
//! 2. "This beta is full" or "This beta isn't accepting any new testers": `Full`.
//! 3. Anything else: `Unknown`.

mod rules;

pub use rules::{default_rules, Rule};

use crate::config::ClassifierConfig;
use crate::state::SlotState;

/// An ordered set of classification rules
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Builds the built-in rules followed by any configured extra markers
    ///
    /// Extra rules only run after the built-in ones have passed, so they can
    /// classify pages that used to be `Unknown` but never override a built-in
    /// decision.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut rules = default_rules();

        if !config.extra_available_markers.is_empty() {
            rules.push(Rule::any_of(
                config.extra_available_markers.iter().cloned(),
                SlotState::Available,
            ));
        }
        if !config.extra_full_markers.is_empty() {
            rules.push(Rule::any_of(
                config.extra_full_markers.iter().cloned(),
                SlotState::Full,
            ));
        }

        Self::new(rules)
    }

    /// Classifies page text; the first matching rule wins
    pub fn classify(&self, text: &str) -> SlotState {
        self.rules
            .iter()
            .find_map(|rule| rule.evaluate(text))
            .unwrap_or(SlotState::Unknown)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Classifies page text with the built-in rules
pub fn classify(text: &str) -> SlotState {
    Classifier::default().classify(text)
}
