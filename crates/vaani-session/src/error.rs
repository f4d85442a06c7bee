use thiserror::Error;
use vaani_temporal::TemporalError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },
    #[error(transparent)]
    Temporal(#[from] TemporalError),
}

impl SessionError {
    pub fn not_found(session_id: impl Into<String>) -> Self {
        Self::NotFound {
            session_id: session_id.into(),
        }
    }
}
