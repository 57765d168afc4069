use serde::{Deserialize, Serialize};

use super::MessageType;

/// Status event travelling from a producer to heartbeat subscribers.
///
/// Messages are never persisted. The `payload` is streamed verbatim as one line,
/// so producers are expected to keep it free of newlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Free-form classifier (e.g. `"status"`, `"sysstat"`).
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Text delivered to subscribers.
    #[serde(alias = "user_data")]
    pub payload: String,
}

impl Message {
    pub fn new(kind: impl Into<MessageType>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}
