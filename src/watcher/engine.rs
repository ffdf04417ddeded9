//! Transition & cooldown engine
//!
//! Decides, for one target and one fresh classification, whether a
//! notification is due. The engine is synchronous and takes `now` as an
//! argument, so every rule below is testable without a clock or a network.
//!
//! # Rules
//!
//! - `state` is always updated to the new classification.
//! - A notification is due on `Opened` (anything → Available) or `Closed`
//!   (Available → Full). Nothing else notifies.
//! - A due notification is suppressed, and dropped, while
//!   `now - last_notified_at < cooldown`.
//! - A delivery failure leaves `last_notified_at` alone and parks the
//!   transition as `pending`; the next tick that still sees the destination
//!   state retries it. A state change drops the pending transition.

use crate::config::{UnknownPolicy, WatchConfig};
use crate::state::{SlotState, Target, Transition};
use chrono::{DateTime, Duration, Utc};

/// What the engine decided for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to send
    Quiet,

    /// Send a notification for this transition
    Notify(Transition),

    /// A notification was due but the cooldown has not elapsed
    Suppressed {
        transition: Transition,
        remaining: Duration,
    },
}

/// How a dispatch attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The provider accepted the message
    Delivered,

    /// The provider rejected the message or could not be reached
    Failed,

    /// No webhook is configured; nothing was attempted
    Skipped,
}

/// Per-target state machine with notification cooldown
#[derive(Debug, Clone, Copy)]
pub struct TransitionEngine {
    cooldown: Duration,
    unknown_policy: UnknownPolicy,
}

impl TransitionEngine {
    pub fn new(cooldown: Duration, unknown_policy: UnknownPolicy) -> Self {
        Self {
            cooldown,
            unknown_policy,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.cooldown(), config.unknown_policy)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// The state a new classification is compared against
    fn prior_state(&self, target: &Target) -> SlotState {
        match self.unknown_policy {
            UnknownPolicy::NotAvailable => target.current_state(),
            UnknownPolicy::Transparent => target.last_definite_state.unwrap_or(SlotState::Unknown),
        }
    }

    /// Applies a classification to `target` and decides whether to notify
    ///
    /// Only call this after a successful fetch: a failed fetch must leave the
    /// target untouched.
    pub fn observe(
        &self,
        target: &mut Target,
        new_state: SlotState,
        now: DateTime<Utc>,
    ) -> Decision {
        let prior = self.prior_state(target);
        let fresh = Transition::between(prior, new_state);
        let pending = target.pending.take();

        target.record_state(new_state);

        let transition = match fresh {
            Some(transition) => transition,
            None => match pending {
                Some(p) if p.destination() == new_state => p,
                Some(p)
                    if new_state == SlotState::Unknown
                        && self.unknown_policy == UnknownPolicy::Transparent =>
                {
                    // An unreadable page says nothing about the pending transition
                    target.pending = Some(p);
                    return Decision::Quiet;
                }
                _ => return Decision::Quiet,
            },
        };

        if let Some(remaining) = self.cooldown_remaining(target, now) {
            return Decision::Suppressed {
                transition,
                remaining,
            };
        }

        Decision::Notify(transition)
    }

    /// Time left before `target` may be notified again, if any
    pub fn cooldown_remaining(&self, target: &Target, now: DateTime<Utc>) -> Option<Duration> {
        if self.cooldown <= Duration::zero() {
            return None;
        }

        let last = target.last_notified_at?;
        let elapsed = now - last;
        if elapsed < Duration::zero() {
            // Wall clock went backwards; the stored time cannot be trusted
            tracing::debug!("{} was last notified in the future, ignoring cooldown", target.name);
            return None;
        }
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }

    /// Records the result of dispatching `transition` for `target`
    pub fn record_delivery(
        &self,
        target: &mut Target,
        transition: Transition,
        outcome: DeliveryOutcome,
        now: DateTime<Utc>,
    ) {
        match outcome {
            DeliveryOutcome::Delivered => target.record_notification(now),
            DeliveryOutcome::Failed => target.pending = Some(transition),
            DeliveryOutcome::Skipped => {}
        }
    }
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}
