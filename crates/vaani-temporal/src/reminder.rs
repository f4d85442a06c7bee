//! One-shot reminder scheduling with asynchronous firing
//!
//! Unlike delay windows, reminders fire proactively: each one gets its own
//! tokio timer task that marks the record triggered when the duration
//! elapses, whether or not anybody is reading.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::TemporalError;

/// A scheduled one-shot reminder tied to a task description.
///
/// `was_triggered` and `is_completed` each flip false to true at most once:
/// the timer sets the former, an explicit acknowledgement sets the latter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub reminder_id: Uuid,
    pub session_id: String,
    pub user_id: String,
    pub task: String,
    pub created_at: DateTime<Utc>,
    pub remind_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub was_triggered: bool,
    pub is_completed: bool,
}

struct ReminderEntry {
    reminder: Reminder,
    /// Timer task handle, aborted on clear. Absent only during insertion.
    handle: Option<JoinHandle<()>>,
}

#[derive(Default, Clone)]
pub struct ReminderScheduler {
    reminders: Arc<RwLock<HashMap<Uuid, ReminderEntry>>>,
}

impl ReminderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a reminder that fires after `duration_seconds`.
    ///
    /// When the timer elapses the record is marked triggered and
    /// `on_trigger` is invoked with the updated record, outside the store
    /// lock. A zero duration is legal and fires immediately. A panicking
    /// callback is confined to its own timer task.
    pub async fn set_reminder<F>(
        &self,
        session_id: &str,
        user_id: &str,
        task: &str,
        duration_seconds: u64,
        on_trigger: F,
    ) -> Result<Reminder, TemporalError>
    where
        F: Fn(Reminder) + Send + Sync + 'static,
    {
        if task.trim().is_empty() {
            return Err(TemporalError::EmptyTask);
        }

        let created_at = Utc::now();
        // Clamp rather than panic on absurd durations.
        let remind_at = TimeDelta::try_seconds(duration_seconds.min(i64::MAX as u64 / 1000) as i64)
            .and_then(|span| created_at.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let reminder = Reminder {
            reminder_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            task: task.trim().to_string(),
            created_at,
            remind_at,
            duration_seconds,
            was_triggered: false,
            is_completed: false,
        };
        let id = reminder.reminder_id;

        // The entry is inserted while the write lock is held, so even a
        // zero-duration timer cannot observe the map without it.
        let mut reminders = self.reminders.write().await;
        reminders.insert(
            id,
            ReminderEntry {
                reminder: reminder.clone(),
                handle: None,
            },
        );

        let store = Arc::clone(&self.reminders);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(duration_seconds)).await;
            let fired = {
                let mut reminders = store.write().await;
                match reminders.get_mut(&id) {
                    Some(entry) => {
                        entry.reminder.was_triggered = true;
                        Some(entry.reminder.clone())
                    }
                    // Cleared before firing.
                    None => None,
                }
            };
            if let Some(reminder) = fired {
                debug!(reminder_id = %id, task = %reminder.task, "reminder fired");
                on_trigger(reminder);
            }
        });

        if let Some(entry) = reminders.get_mut(&id) {
            entry.handle = Some(handle);
        }
        drop(reminders);

        debug!(reminder_id = %id, session_id, duration_seconds, "reminder scheduled");
        Ok(reminder)
    }

    /// Reminders for a session that have fired but are not yet
    /// acknowledged, in creation order.
    pub async fn pending_reminders(&self, session_id: &str) -> Vec<Reminder> {
        let reminders = self.reminders.read().await;
        let mut pending: Vec<Reminder> = reminders
            .values()
            .filter(|entry| {
                entry.reminder.session_id == session_id
                    && entry.reminder.was_triggered
                    && !entry.reminder.is_completed
            })
            .map(|entry| entry.reminder.clone())
            .collect();
        pending.sort_by_key(|r| (r.created_at, r.reminder_id));
        pending
    }

    /// Acknowledge a fired reminder. Idempotent; returns whether the
    /// reminder exists.
    pub async fn complete_reminder(&self, reminder_id: Uuid) -> bool {
        let mut reminders = self.reminders.write().await;
        match reminders.get_mut(&reminder_id) {
            Some(entry) => {
                entry.reminder.is_completed = true;
                true
            }
            None => false,
        }
    }

    /// Cancel every timer for a session and drop its records.
    ///
    /// Cancellation is best-effort against an in-flight firing: a callback
    /// that has already started running is not interrupted.
    pub async fn clear_session_reminders(&self, session_id: &str) {
        let mut reminders = self.reminders.write().await;
        let ids: Vec<Uuid> = reminders
            .iter()
            .filter(|(_, entry)| entry.reminder.session_id == session_id)
            .map(|(id, _)| *id)
            .collect();
        let cleared = ids.len();
        for id in ids {
            if let Some(entry) = reminders.remove(&id) {
                if let Some(handle) = entry.handle {
                    handle.abort();
                }
            }
        }
        if cleared > 0 {
            debug!(session_id, cleared, "session reminders cleared");
        }
    }

    pub async fn get_reminder(&self, reminder_id: Uuid) -> Option<Reminder> {
        self.reminders
            .read()
            .await
            .get(&reminder_id)
            .map(|entry| entry.reminder.clone())
    }

    pub async fn reminder_count(&self) -> usize {
        self.reminders.read().await.len()
    }

    pub async fn session_reminder_count(&self, session_id: &str) -> usize {
        self.reminders
            .read()
            .await
            .values()
            .filter(|entry| entry.reminder.session_id == session_id)
            .count()
    }
}
