//! Streaming progress events sent to a subscribed client (type + payload).
//! Plain-data variants only; the orchestrator builds these as the pipeline runs.

use serde::Serialize;
use serde_json::Value;

/// Wire shape for one stream event; envelope (session_id, event_id) is applied separately.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// First event on a new subscription; carries the session id to reconnect with.
    Connected { session_id: String },
    /// Human-readable pipeline progress, with an optional completion percentage.
    Progress {
        stage: String,
        message: String,
        percent: Option<u8>,
        emoji: Option<String>,
    },
    /// One streamed chunk of the answer. `is_final` marks the last chunk of the stream.
    Token { text: String, is_final: bool },
    /// The complete answer, sent once after streaming ends (or in place of streaming
    /// for non-streaming calls).
    FinalAnswer { text: String },
    /// The conversation id the exchange was persisted under.
    ConversationId { id: String },
    /// A (re)computed title for the conversation.
    ConversationTitleUpdate {
        conversation_id: String,
        title: String,
    },
    /// A terminal pipeline failure; no further events follow on this subscription.
    Error { message: String },
    /// Idle-connection keepalive; carries no payload.
    Keepalive,
}

impl ProgressEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
