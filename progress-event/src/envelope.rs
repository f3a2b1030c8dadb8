//! Envelope (session_id, event_id) injected into every outgoing event.
//! EnvelopeState hands out a monotonically increasing event_id per session.

use crate::event::ProgressEvent;
use serde_json::Value;

/// Envelope fields attached to each message.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Session ID; constant within a session.
    pub session_id: Option<String>,
    /// Per-message sequence number; monotonically increasing within a session.
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.session_id {
            obj.entry("session_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(id) = self.event_id {
            obj.entry("event_id")
                .or_insert_with(|| Value::Number(serde_json::Number::from(id)));
        }
    }
}

/// Envelope state for one session: session_id and the next event_id to hand out.
pub struct EnvelopeState {
    pub session_id: String,
    pub next_event_id: u64,
}

impl EnvelopeState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            next_event_id: 1,
        }
    }

    /// Injects envelope into the event value and advances the event_id counter.
    pub fn inject_into(&mut self, value: &mut Value) {
        let env = Envelope::new()
            .with_session_id(&self.session_id)
            .with_event_id(self.next_event_id);
        self.next_event_id += 1;
        env.inject_into(value);
    }

    /// Peeks the envelope that would be attached to the next event, without advancing.
    pub fn peek_envelope(&self) -> Envelope {
        Envelope::new()
            .with_session_id(&self.session_id)
            .with_event_id(self.next_event_id)
    }
}

/// Converts a progress event to JSON and injects envelope using the given state.
/// Returns the final value (type + payload + session_id + event_id).
pub fn to_json(
    event: &ProgressEvent,
    state: &mut EnvelopeState,
) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value);
    Ok(value)
}
