//! Keep-alive daemon for the external embedding endpoint.
//!
//! Grounded on `examples/original_source/src/embedding_keepalive.py`:
//! checks idle time once a minute, pings only after the configured idle
//! interval has elapsed, skips loopback endpoints, and never stops the loop
//! on a failed ping (it is merely logged).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs()
}

/// Shared last-activity timestamp, updated by every successful embed call
/// (external or internal) and read by the keep-alive loop.
pub struct ActivityTracker {
    last_activity_secs: AtomicU64,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self { last_activity_secs: AtomicU64::new(now_secs()) }
    }
}

impl ActivityTracker {
    pub async fn update_activity(&self) {
        self.last_activity_secs.store(now_secs(), Ordering::SeqCst);
    }

    fn idle_for(&self) -> Duration {
        let last = self.last_activity_secs.load(Ordering::SeqCst);
        Duration::from_secs(now_secs().saturating_sub(last))
    }
}

const POLL_INTERVAL: Duration = Duration::from_secs(60);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

fn is_loopback(endpoint: &str) -> bool {
    endpoint.contains("127.0.0.1") || endpoint.contains("localhost")
}

pub struct KeepAlive {
    http: reqwest::Client,
    endpoint: Option<String>,
    ping_interval: Duration,
    activity: Arc<ActivityTracker>,
}

impl KeepAlive {
    pub fn new(endpoint: Option<String>, ping_interval_minutes: u64, activity: Arc<ActivityTracker>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            ping_interval: Duration::from_secs(ping_interval_minutes * 60),
            activity,
        }
    }

    fn enabled(&self) -> bool {
        match &self.endpoint {
            None => false,
            Some(e) => !e.is_empty() && !is_loopback(e),
        }
    }

    async fn ping(&self) -> bool {
        let Some(endpoint) = &self.endpoint else { return true };
        let result = tokio::time::timeout(
            PING_TIMEOUT,
            self.http.post(endpoint).json(&serde_json::json!({ "text": "ping" })).send(),
        )
        .await;
        match result {
            Ok(Ok(resp)) if resp.status().is_success() => true,
            Ok(Ok(resp)) => {
                tracing::warn!(status = %resp.status(), "embedding keep-alive ping returned non-success status");
                false
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "embedding keep-alive ping failed");
                false
            }
            Err(_) => {
                tracing::warn!("embedding keep-alive ping timed out");
                false
            }
        }
    }

    /// Runs until cancelled. Intended to be spawned as a background task;
    /// the process owner is responsible for starting/stopping it (it is
    /// never auto-started by constructing an embedding client).
    pub async fn run(self) {
        if !self.enabled() {
            tracing::info!("embedding keep-alive disabled: no external endpoint or loopback endpoint");
            return;
        }
        loop {
            if self.activity.idle_for() >= self.ping_interval {
                self.ping().await;
                self.activity.update_activity().await;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_no_endpoint() {
        let activity = Arc::new(ActivityTracker::default());
        let keepalive = KeepAlive::new(None, 10, activity);
        assert!(!keepalive.enabled());
    }

    #[test]
    fn disabled_for_loopback_endpoint() {
        let activity = Arc::new(ActivityTracker::default());
        let keepalive = KeepAlive::new(Some("http://127.0.0.1:9000/embed".to_string()), 10, activity);
        assert!(!keepalive.enabled());
    }

    #[test]
    fn enabled_for_remote_endpoint() {
        let activity = Arc::new(ActivityTracker::default());
        let keepalive = KeepAlive::new(Some("https://embed.example.com".to_string()), 10, activity);
        assert!(keepalive.enabled());
    }

    #[tokio::test]
    async fn activity_tracker_resets_idle_time() {
        let tracker = ActivityTracker::default();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(tracker.idle_for() >= Duration::from_millis(5));
        tracker.update_activity().await;
        assert!(tracker.idle_for() < Duration::from_millis(5));
    }
}
