//! Per-session ordered exchange log, bounded to the 5 most recent entries.
//!
//! The per-session-locked concurrent map idiom follows `loom`'s general
//! use of `dashmap` for per-key state (e.g. `loom/src/channels/named_barrier.rs`).

use dashmap::DashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const MAX_EXCHANGES: usize = 5;
const MAX_SYSTEM_CHARS: usize = 1000;

#[derive(Clone, Debug)]
pub struct Exchange {
    pub user: String,
    pub system: String,
    pub timestamp_secs: u64,
}

#[derive(Default)]
struct Session {
    exchanges: Vec<Exchange>,
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_secs()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Thread-safe, per-session bounded conversation log.
#[derive(Default)]
pub struct ConversationMemory {
    sessions: DashMap<String, Mutex<Session>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, session_id: &str, user: &str, system: &str) {
        let entry = self.sessions.entry(session_id.to_string()).or_default();
        let mut session = entry.lock().expect("conversation memory mutex poisoned");
        session.exchanges.push(Exchange {
            user: user.trim().to_string(),
            system: truncate_chars(system.trim(), MAX_SYSTEM_CHARS),
            timestamp_secs: now_secs(),
        });
        if session.exchanges.len() > MAX_EXCHANGES {
            let excess = session.exchanges.len() - MAX_EXCHANGES;
            session.exchanges.drain(0..excess);
        }
    }

    /// Returns `"0"` (the literal "no memory" sentinel) when the session is
    /// absent or empty; otherwise alternating `USER: ...` / `SYSTEM: ...`
    /// lines in chronological order.
    pub fn get(&self, session_id: &str) -> String {
        let Some(entry) = self.sessions.get(session_id) else {
            return "0".to_string();
        };
        let session = entry.lock().expect("conversation memory mutex poisoned");
        if session.exchanges.is_empty() {
            return "0".to_string();
        }
        let mut lines = Vec::with_capacity(session.exchanges.len() * 2);
        for exchange in &session.exchanges {
            lines.push(format!("USER: {}", exchange.user.split_whitespace().collect::<Vec<_>>().join(" ")));
            lines.push(format!("SYSTEM: {}", exchange.system.split_whitespace().collect::<Vec<_>>().join(" ")));
        }
        lines.join("\n")
    }

    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Loads history from an older conversation, replacing whatever is
    /// currently stored for this session (bounded the same way as `append`).
    pub fn rebuild(&self, session_id: &str, exchanges: Vec<Exchange>) {
        let bounded = if exchanges.len() > MAX_EXCHANGES {
            exchanges[exchanges.len() - MAX_EXCHANGES..].to_vec()
        } else {
            exchanges
        };
        self.sessions.insert(session_id.to_string(), Mutex::new(Session { exchanges: bounded }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_session_returns_sentinel() {
        let memory = ConversationMemory::new();
        assert_eq!(memory.get("unknown"), "0");
    }

    #[test]
    fn append_then_get_formats_alternating_lines() {
        let memory = ConversationMemory::new();
        memory.append("s1", "hei", "hallo");
        assert_eq!(memory.get("s1"), "USER: hei\nSYSTEM: hallo");
    }

    #[test]
    fn caps_at_five_most_recent_exchanges() {
        let memory = ConversationMemory::new();
        for i in 0..8 {
            memory.append("s1", &format!("q{i}"), &format!("a{i}"));
        }
        let formatted = memory.get("s1");
        let lines: Vec<_> = formatted.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "USER: q3");
        assert_eq!(lines.last().unwrap(), &"SYSTEM: a7");
    }

    #[test]
    fn system_text_is_truncated() {
        let memory = ConversationMemory::new();
        let long_system = "x".repeat(2000);
        memory.append("s1", "q", &long_system);
        let formatted = memory.get("s1");
        let system_line = formatted.lines().nth(1).unwrap();
        assert_eq!(system_line.len(), "SYSTEM: ".len() + MAX_SYSTEM_CHARS);
    }

    #[test]
    fn clear_resets_to_sentinel() {
        let memory = ConversationMemory::new();
        memory.append("s1", "q", "a");
        memory.clear("s1");
        assert_eq!(memory.get("s1"), "0");
    }

    #[test]
    fn sessions_are_isolated() {
        let memory = ConversationMemory::new();
        memory.append("a", "qa", "aa");
        assert_eq!(memory.get("b"), "0");
    }
}
