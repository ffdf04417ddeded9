//! State module for tracking targets between polls
//!
//! # Components
//!
//! - `SlotState`: The classification of a single page (available, full, unknown)
//! - `Transition`: A notify-worthy change between two slot states
//! - `Target` / `TargetMap`: The monitored programs and their per-target state

mod slot_state;
mod target;

// Re-export main types
pub use slot_state::{SlotState, Transition};
pub use target::{Target, TargetMap};
