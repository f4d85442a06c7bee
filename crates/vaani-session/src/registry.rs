//! Session lifecycle and the aggregate root the orchestration layer calls
//!
//! The registry owns the live session map and composes the delay tracker,
//! the reminder scheduler and the memory-store collaborator, so callers
//! deal with one surface keyed by session id.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vaani_temporal::{
    parse_delay, parse_reminder, Delay, DelayTracker, Elapsed, Reminder, ReminderScheduler,
    TimeContext,
};

use crate::error::SessionError;
use crate::memory::{LongTermMemoryStore, StoredMessage};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// One tracked conversation. Lives in the registry's map until
/// `end_session` removes it; `memory_ids` only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub interaction_count: u64,
    pub memory_ids: Vec<String>,
    pub status: SessionStatus,
}

/// What `create_session` hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub time_context: TimeContext,
}

/// Fields merged over a session by `update_session`. An explicit
/// `interaction_count` suppresses the automatic increment.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub interaction_count: Option<u64>,
    pub append_memory_ids: Vec<String>,
}

/// A session read, stamped with elapsed time and the reminders waiting
/// for acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: Session,
    pub elapsed: Elapsed,
    pub pending_reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration: String,
    pub interaction_count: u64,
    pub memory_ids: Vec<String>,
    /// Set when persisting the summary to the memory store failed. The
    /// session is removed from the live set either way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_error: Option<String>,
}

/// Result of scanning one utterance for temporal intent.
#[derive(Debug, Clone)]
pub enum UtteranceOutcome {
    DelayCreated(Delay),
    ReminderSet(Reminder),
    NoTemporalIntent,
}

pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    delays: DelayTracker,
    reminders: ReminderScheduler,
    memory: Arc<dyn LongTermMemoryStore>,
}

impl SessionRegistry {
    pub fn new(memory: Arc<dyn LongTermMemoryStore>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            delays: DelayTracker::new(),
            reminders: ReminderScheduler::new(),
            memory,
        }
    }

    pub async fn create_session(&self, user_id: &str) -> CreatedSession {
        let now = Utc::now();
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            started_at: now,
            last_active: now,
            interaction_count: 0,
            memory_ids: Vec::new(),
            status: SessionStatus::Active,
        };
        let created = CreatedSession {
            session_id: session.session_id.clone(),
            started_at: session.started_at,
            time_context: TimeContext::now(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.clone(), session);
        info!(session_id = %created.session_id, user_id, "session created");
        created
    }

    /// Merge `update` over the session, refresh `last_active`, and bump
    /// `interaction_count` unless the caller supplied one explicitly.
    pub async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::not_found(session_id))?;

        session.last_active = Utc::now();
        match update.interaction_count {
            Some(count) => session.interaction_count = count,
            None => session.interaction_count += 1,
        }
        session.memory_ids.extend(update.append_memory_ids);
        Ok(session.clone())
    }

    /// Append one memory-store record id without counting an interaction.
    pub async fn record_memory_id(
        &self,
        session_id: &str,
        memory_id: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::not_found(session_id))?;
        session.memory_ids.push(memory_id.into());
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Option<SessionView> {
        let session = self.sessions.read().await.get(session_id).cloned()?;
        let elapsed = Elapsed::since_ms(session.started_at.timestamp_millis());
        let pending_reminders = self.reminders.pending_reminders(session_id).await;
        Some(SessionView {
            session,
            elapsed,
            pending_reminders,
        })
    }

    /// End a session: cancel its reminders and delay, remove it from the
    /// live set, and persist a one-line summary to the memory store.
    ///
    /// A store failure is non-fatal; it is reported on the summary and the
    /// session is gone regardless.
    pub async fn end_session(&self, session_id: &str) -> Result<SessionSummary, SessionError> {
        let mut session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(session_id)
                .ok_or_else(|| SessionError::not_found(session_id))?
        };
        session.status = SessionStatus::Ended;

        self.reminders.clear_session_reminders(session_id).await;
        self.delays.clear_delay(session_id).await;

        let ended_at = Utc::now();
        let elapsed = Elapsed::between_ms(
            session.started_at.timestamp_millis(),
            ended_at.timestamp_millis(),
        );
        let mut summary = SessionSummary {
            session_id: session.session_id.clone(),
            user_id: session.user_id.clone(),
            started_at: session.started_at,
            ended_at,
            duration: elapsed.human_readable.clone(),
            interaction_count: session.interaction_count,
            memory_ids: session.memory_ids.clone(),
            memory_error: None,
        };

        let line = format!(
            "Conversation with {} ended after {} with {} interactions.",
            session.user_id, summary.duration, session.interaction_count
        );
        let messages = [StoredMessage::new("system", line)];
        let metadata = serde_json::json!({
            "category": "session_summary",
            "summary": serde_json::to_value(&summary).unwrap_or_default(),
        });

        match self
            .memory
            .store_conversation(&session.user_id, &messages, metadata)
            .await
        {
            Ok(memory_id) => {
                debug!(session_id, %memory_id, "session summary persisted");
            }
            Err(error) => {
                warn!(session_id, error = %error, "failed to persist session summary");
                summary.memory_error = Some(error.to_string());
            }
        }

        info!(
            session_id,
            interactions = summary.interaction_count,
            duration = %summary.duration,
            "session ended"
        );
        Ok(summary)
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn sessions_for_user(&self, user_id: &str) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    // Temporal operations, keyed by session id. The creators check that
    // the session is live so no delay or reminder is born orphaned.

    pub async fn create_delay(
        &self,
        session_id: &str,
        delay_seconds: u64,
    ) -> Result<Delay, SessionError> {
        self.ensure_session(session_id).await?;
        Ok(self.delays.create_delay(session_id, delay_seconds).await?)
    }

    pub async fn has_active_delay(&self, session_id: &str) -> bool {
        self.delays.has_active_delay(session_id).await
    }

    pub async fn remaining_delay_secs(&self, session_id: &str) -> u64 {
        self.delays.remaining_delay_secs(session_id).await
    }

    pub async fn clear_delay(&self, session_id: &str) -> bool {
        self.delays.clear_delay(session_id).await
    }

    pub async fn set_reminder<F>(
        &self,
        session_id: &str,
        task: &str,
        duration_seconds: u64,
        on_trigger: F,
    ) -> Result<Reminder, SessionError>
    where
        F: Fn(Reminder) + Send + Sync + 'static,
    {
        let user_id = {
            let sessions = self.sessions.read().await;
            sessions
                .get(session_id)
                .map(|s| s.user_id.clone())
                .ok_or_else(|| SessionError::not_found(session_id))?
        };
        Ok(self
            .reminders
            .set_reminder(session_id, &user_id, task, duration_seconds, on_trigger)
            .await?)
    }

    pub async fn pending_reminders(&self, session_id: &str) -> Vec<Reminder> {
        self.reminders.pending_reminders(session_id).await
    }

    pub async fn complete_reminder(&self, reminder_id: Uuid) -> bool {
        self.reminders.complete_reminder(reminder_id).await
    }

    pub async fn clear_session_reminders(&self, session_id: &str) {
        self.reminders.clear_session_reminders(session_id).await
    }

    /// Scan one utterance for temporal intent and apply the first hit.
    /// Delay phrasings take precedence over reminder phrasings.
    pub async fn interpret_utterance<F>(
        &self,
        session_id: &str,
        text: &str,
        on_trigger: F,
    ) -> Result<UtteranceOutcome, SessionError>
    where
        F: Fn(Reminder) + Send + Sync + 'static,
    {
        self.ensure_session(session_id).await?;

        if let Some(request) = parse_delay(text) {
            let delay = self.create_delay(session_id, request.delay_seconds).await?;
            return Ok(UtteranceOutcome::DelayCreated(delay));
        }
        if let Some(request) = parse_reminder(text) {
            let reminder = self
                .set_reminder(session_id, &request.task, request.duration_seconds, on_trigger)
                .await?;
            return Ok(UtteranceOutcome::ReminderSet(reminder));
        }
        Ok(UtteranceOutcome::NoTemporalIntent)
    }

    async fn ensure_session(&self, session_id: &str) -> Result<(), SessionError> {
        if self.sessions.read().await.contains_key(session_id) {
            Ok(())
        } else {
            Err(SessionError::not_found(session_id))
        }
    }
}
