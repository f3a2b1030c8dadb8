//! Session-scoped progress bus: buffers events for replay, then live-tails
//! new ones to a subscriber with periodic keepalives.
//!
//! Grounded on `examples/original_source/src/sse_manager.py`'s `SSESession`/
//! `SSEManager` (replace-on-create, `is_expired(timeout=600)`,
//! `create_sse_response`'s `max_timeout=1800`/`keepalive_interval=30`) and
//! `progress-event`'s `EnvelopeState` for per-session monotonic `event_id`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use progress_event::{EnvelopeState, ProgressEvent};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;

/// A session is dropped once idle (no publish) for this long.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(600);
/// A subscription is force-closed after this much wall time regardless of activity.
const STREAM_HARD_CAP: Duration = Duration::from_secs(1800);
/// A keepalive event is emitted after this much silence on a subscription.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

struct Session {
    envelope_state: EnvelopeState,
    replay: Vec<Value>,
    last_activity: Instant,
    active: bool,
    tx: broadcast::Sender<Value>,
}

impl Session {
    fn new(session_id: String) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            envelope_state: EnvelopeState::new(session_id),
            replay: Vec::new(),
            last_activity: Instant::now(),
            active: true,
            tx,
        }
    }

    fn is_expired(&self) -> bool {
        self.last_activity.elapsed() > SESSION_IDLE_TIMEOUT
    }
}

/// Registry of active progress sessions, keyed by session id.
pub struct ProgressBus {
    sessions: Mutex<HashMap<String, Session>>,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a fresh session, replacing any existing one under the same id
    /// so a reconnect never sees stale messages. Returns the session id used
    /// (generated if `session_id` is `None`).
    pub async fn create_session(&self, session_id: Option<String>) -> String {
        let id = session_id.unwrap_or_else(Self::generate_session_id);
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(id.clone(), Session::new(id.clone()));
        id
    }

    fn generate_session_id() -> String {
        let epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("sess-{epoch}-{seq}")
    }

    /// Publishes an event to a session: appends it to the replay buffer
    /// (envelope-stamped) and broadcasts it to any live subscriber. Returns
    /// `false` if the session is unknown or has been closed.
    pub async fn publish(&self, session_id: &str, event: ProgressEvent) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        if !session.active {
            return false;
        }
        let Ok(value) = progress_event::to_json(&event, &mut session.envelope_state) else {
            return false;
        };
        session.replay.push(value.clone());
        session.last_activity = Instant::now();
        let _ = session.tx.send(value);
        true
    }

    /// Marks a session inactive so further publishes and any open
    /// subscription stop, without removing its replay buffer immediately.
    pub async fn close_session(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.active = false;
            // Nudges any blocked subscriber past its `recv().await` so the
            // closed-session check on the next loop iteration runs promptly
            // instead of waiting out the keepalive interval.
            let _ = session.tx.send(Value::Null);
        }
    }

    /// Subscribes to a session: replays everything buffered so far, then
    /// forwards new events live, interleaving keepalives on silence. Ends
    /// when the session closes, goes idle past [`SESSION_IDLE_TIMEOUT`], or
    /// the subscription itself reaches [`STREAM_HARD_CAP`].
    ///
    /// Creates the session automatically if it does not exist.
    pub async fn subscribe(
        self: &std::sync::Arc<Self>,
        session_id: String,
    ) -> ReceiverStream<Value> {
        let (connected, replay, mut broadcast_rx) = {
            let mut sessions = self.sessions.lock().await;
            if !sessions.contains_key(&session_id) {
                sessions.insert(session_id.clone(), Session::new(session_id.clone()));
            }
            let session = sessions.get_mut(&session_id).expect("just inserted");
            let connected_event = ProgressEvent::Connected {
                session_id: session_id.clone(),
            };
            let connected = progress_event::to_json(&connected_event, &mut session.envelope_state)
                .unwrap_or_default();
            (connected, session.replay.clone(), session.tx.subscribe())
        };

        let (out_tx, out_rx) = tokio::sync::mpsc::channel(256);
        let bus = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            if out_tx.send(connected).await.is_err() {
                return;
            }
            for value in replay {
                if out_tx.send(value).await.is_err() {
                    return;
                }
            }

            let start = Instant::now();
            loop {
                if start.elapsed() > STREAM_HARD_CAP {
                    return;
                }
                {
                    let sessions = bus.sessions.lock().await;
                    match sessions.get(&session_id) {
                        Some(s) if !s.active || s.is_expired() => return,
                        None => return,
                        _ => {}
                    }
                }

                tokio::select! {
                    received = broadcast_rx.recv() => {
                        match received {
                            // `Null` is an internal wake-up sentinel from `close_session`,
                            // not a real event; it's never forwarded to the subscriber.
                            Ok(Value::Null) => continue,
                            Ok(value) => {
                                if out_tx.send(value).await.is_err() {
                                    return;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => return,
                        }
                    }
                    _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {
                        let keepalive = ProgressEvent::Keepalive.to_value().unwrap_or_default();
                        if out_tx.send(keepalive).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        ReceiverStream::new(out_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn create_session_replaces_existing() {
        let bus = ProgressBus::new();
        let id = bus.create_session(Some("fixed".to_string())).await;
        bus.publish(&id, ProgressEvent::Connected { session_id: id.clone() }).await;
        let id2 = bus.create_session(Some("fixed".to_string())).await;
        assert_eq!(id, id2);
        let sessions = bus.sessions.lock().await;
        assert!(sessions.get(&id2).unwrap().replay.is_empty());
    }

    #[tokio::test]
    async fn publish_to_unknown_session_returns_false() {
        let bus = ProgressBus::new();
        let ok = bus.publish("nope", ProgressEvent::Keepalive).await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn subscribe_emits_connected_then_replays_buffer_in_order() {
        let bus = std::sync::Arc::new(ProgressBus::new());
        let id = bus.create_session(None).await;
        bus.publish(&id, ProgressEvent::Progress {
            stage: "validate".to_string(),
            message: "ok".to_string(),
            percent: Some(10),
            emoji: None,
        }).await;
        bus.publish(&id, ProgressEvent::Progress {
            stage: "analysis".to_string(),
            message: "ok".to_string(),
            percent: Some(15),
            emoji: None,
        }).await;

        let mut stream = bus.subscribe(id.clone()).await;
        let first = stream.next().await.unwrap();
        assert_eq!(first["type"], "connected");
        let second = stream.next().await.unwrap();
        assert_eq!(second["type"], "progress");
        assert_eq!(second["stage"], "validate");
        let third = stream.next().await.unwrap();
        assert_eq!(third["type"], "progress");
        assert_eq!(third["stage"], "analysis");
    }

    #[tokio::test]
    async fn subscribe_forwards_live_publish_after_connected_and_replay() {
        let bus = std::sync::Arc::new(ProgressBus::new());
        let id = bus.create_session(None).await;
        let mut stream = bus.subscribe(id.clone()).await;
        let connected = stream.next().await.unwrap();
        assert_eq!(connected["type"], "connected");
        bus.publish(&id, ProgressEvent::FinalAnswer { text: "svar".to_string() }).await;
        let ev = stream.next().await.unwrap();
        assert_eq!(ev["type"], "final_answer");
        assert_eq!(ev["text"], "svar");
    }

    #[tokio::test]
    async fn closed_session_stops_live_forwarding() {
        let bus = std::sync::Arc::new(ProgressBus::new());
        let id = bus.create_session(None).await;
        let mut stream = bus.subscribe(id.clone()).await;
        let connected = stream.next().await.unwrap();
        assert_eq!(connected["type"], "connected");
        bus.close_session(&id).await;
        assert!(stream.next().await.is_none());
    }
}
