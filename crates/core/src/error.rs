//! Error taxonomy for the upload core.

use thiserror::Error;

/// Queue errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// No model left to dequeue.
    #[error("upload queue is empty")]
    EmptyQueue,
}

/// Failures talking to the command service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Upload submission was rejected or never reached the service.
    #[error("submit failed: {0}")]
    SubmitFailed(String),
    /// Status poll was rejected or never reached the service.
    #[error("poll failed: {0}")]
    PollFailed(String),
    /// Bulk model removal failed.
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

/// Session setup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No car was selected.
    #[error("no target car selected")]
    NoTargetCar,
    /// Tick interval must be positive.
    #[error("tick interval must be greater than zero")]
    ZeroInterval,
}
