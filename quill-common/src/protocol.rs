use serde::{Deserialize, Serialize};

/// First frame every client receives after the upgrade.
pub const GREETING: &str = "Connected! Waiting for the AI agent to start...";

/// Text handed back to callers that only understand strings when nobody answered in time.
pub const NO_RESPONSE: &str = "No response received within the timeout period.";

/// Server → Client message.
///
/// Client → Server traffic is the raw answer text, so there is no
/// matching client type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub question: String,
}

impl ServerMessage {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            question: text.into(),
        }
    }

    pub fn greeting() -> Self {
        Self::question(GREETING)
    }
}
