//! Response-delay windows, one per session at most
//!
//! Delays are short-lived and polled by the orchestration layer before it
//! produces the next response, so expiry is evaluated lazily on read
//! instead of running a timer per window.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::TemporalError;

/// An active or expired response-delay window for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delay {
    pub session_id: String,
    pub delay_seconds: u64,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Flipped to false the first time a read observes the window expired.
    /// Never flips back.
    pub is_active: bool,
}

#[derive(Default, Clone)]
pub struct DelayTracker {
    delays: Arc<RwLock<HashMap<String, Delay>>>,
}

impl DelayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a delay window for a session, replacing any existing one.
    /// Last write wins; there is no queue of delays.
    pub async fn create_delay(
        &self,
        session_id: &str,
        delay_seconds: u64,
    ) -> Result<Delay, TemporalError> {
        self.create_delay_at(session_id, delay_seconds, Utc::now().timestamp_millis())
            .await
    }

    async fn create_delay_at(
        &self,
        session_id: &str,
        delay_seconds: u64,
        now_ms: i64,
    ) -> Result<Delay, TemporalError> {
        if delay_seconds == 0 {
            return Err(TemporalError::InvalidDuration);
        }
        // Clamp rather than overflow on absurd durations.
        let span_ms = delay_seconds.min((i64::MAX / 1000) as u64) as i64 * 1000;
        let delay = Delay {
            session_id: session_id.to_string(),
            delay_seconds,
            start_ms: now_ms,
            end_ms: now_ms.saturating_add(span_ms),
            is_active: true,
        };
        let mut delays = self.delays.write().await;
        let replaced = delays
            .insert(session_id.to_string(), delay.clone())
            .is_some();
        debug!(session_id, delay_seconds, replaced, "delay window created");
        Ok(delay)
    }

    /// Whether the session's delay window is still in effect.
    pub async fn has_active_delay(&self, session_id: &str) -> bool {
        self.poll_active(session_id, Utc::now().timestamp_millis())
            .await
    }

    async fn poll_active(&self, session_id: &str, now_ms: i64) -> bool {
        let mut delays = self.delays.write().await;
        let Some(delay) = delays.get_mut(session_id) else {
            return false;
        };
        if delay.is_active && now_ms >= delay.end_ms {
            delay.is_active = false;
            debug!(session_id, "delay window expired");
        }
        delay.is_active
    }

    /// Whole seconds left in the session's delay window, rounded up.
    /// Zero when there is no window or it has expired.
    pub async fn remaining_delay_secs(&self, session_id: &str) -> u64 {
        self.remaining_at(session_id, Utc::now().timestamp_millis())
            .await
    }

    async fn remaining_at(&self, session_id: &str, now_ms: i64) -> u64 {
        let mut delays = self.delays.write().await;
        let Some(delay) = delays.get_mut(session_id) else {
            return 0;
        };
        let remaining_ms = delay.end_ms - now_ms;
        if remaining_ms <= 0 {
            if delay.is_active {
                delay.is_active = false;
                debug!(session_id, "delay window expired");
            }
            return 0;
        }
        if !delay.is_active {
            return 0;
        }
        ((remaining_ms - 1) / 1000 + 1) as u64
    }

    /// Remove the session's delay window. Returns whether one existed.
    pub async fn clear_delay(&self, session_id: &str) -> bool {
        self.delays.write().await.remove(session_id).is_some()
    }

    pub async fn get_delay(&self, session_id: &str) -> Option<Delay> {
        self.delays.read().await.get(session_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_rejects_zero_duration() {
        let tracker = DelayTracker::new();
        let err = tracker.create_delay("s1", 0).await.unwrap_err();
        assert_eq!(err, TemporalError::InvalidDuration);
        assert!(tracker.get_delay("s1").await.is_none());
    }

    #[tokio::test]
    async fn create_computes_window() {
        let tracker = DelayTracker::new();
        let delay = tracker.create_delay_at("s1", 5, 1_000).await.unwrap();
        assert_eq!(delay.start_ms, 1_000);
        assert_eq!(delay.end_ms, 6_000);
        assert!(delay.is_active);
    }

    #[tokio::test]
    async fn create_replaces_existing_window() {
        let tracker = DelayTracker::new();
        tracker.create_delay_at("s1", 5, 1_000).await.unwrap();
        tracker.create_delay_at("s1", 30, 2_000).await.unwrap();
        let delay = tracker.get_delay("s1").await.unwrap();
        assert_eq!(delay.delay_seconds, 30);
        assert_eq!(delay.end_ms, 32_000);
    }

    #[tokio::test]
    async fn active_before_end_expired_after() {
        let tracker = DelayTracker::new();
        tracker.create_delay_at("s1", 5, 1_000).await.unwrap();
        assert!(tracker.poll_active("s1", 5_999).await);
        assert!(!tracker.poll_active("s1", 6_000).await);
    }

    #[tokio::test]
    async fn expiry_is_monotonic() {
        let tracker = DelayTracker::new();
        tracker.create_delay_at("s1", 5, 1_000).await.unwrap();
        assert!(!tracker.poll_active("s1", 7_000).await);
        // An earlier clock reading after the flip must not reactivate it.
        assert!(!tracker.poll_active("s1", 2_000).await);
        assert_eq!(tracker.remaining_at("s1", 2_000).await, 0);
    }

    #[tokio::test]
    async fn remaining_rounds_up() {
        let tracker = DelayTracker::new();
        tracker.create_delay_at("s1", 5, 1_000).await.unwrap();
        assert_eq!(tracker.remaining_at("s1", 1_000).await, 5);
        assert_eq!(tracker.remaining_at("s1", 1_001).await, 5);
        assert_eq!(tracker.remaining_at("s1", 5_000).await, 1);
        assert_eq!(tracker.remaining_at("s1", 5_999).await, 1);
        assert_eq!(tracker.remaining_at("s1", 6_000).await, 0);
    }

    #[tokio::test]
    async fn remaining_for_unknown_session_is_zero() {
        let tracker = DelayTracker::new();
        assert_eq!(tracker.remaining_delay_secs("missing").await, 0);
        assert!(!tracker.has_active_delay("missing").await);
    }

    #[tokio::test]
    async fn clear_reports_presence() {
        let tracker = DelayTracker::new();
        tracker.create_delay("s1", 5).await.unwrap();
        assert!(tracker.clear_delay("s1").await);
        assert!(!tracker.clear_delay("s1").await);
        assert!(!tracker.has_active_delay("s1").await);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let tracker = DelayTracker::new();
        tracker.create_delay_at("s1", 5, 1_000).await.unwrap();
        tracker.create_delay_at("s2", 60, 1_000).await.unwrap();
        assert!(!tracker.poll_active("s1", 10_000).await);
        assert!(tracker.poll_active("s2", 10_000).await);
    }
}
