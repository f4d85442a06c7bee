use thiserror::Error;

/// Validation failures raised before any state is mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("delay duration must be at least one second")]
    InvalidDuration,
    #[error("reminder task must not be empty")]
    EmptyTask,
}
