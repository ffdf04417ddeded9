use crate::state::{Target, Transition};

/// Payload sent by `validate_webhook`
pub const TEST_MESSAGE: &str = "Test message from slot-watch to validate webhook.";

/// Formats the chat message for a transition of `target`
pub fn format_message(target: &Target, transition: Transition) -> String {
    match transition {
        Transition::Opened => format!(
            "🚀 TestFlight slots for {} are AVAILABLE!\n- Web Link: {}",
            target.name, target.url
        ),
        Transition::Closed => format!(
            "❌ TestFlight slot for {} is FILLED.\n- Web Link: {}",
            target.name, target.url
        ),
    }
}
