//! Error taxonomy shared by the core logic and the runtime engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CadenceError {
    /// Malformed recurrence config. Rejected at creation/update time, never persisted.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Referenced reminder or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller does not own the target reminder. Logged as a security-relevant event.
    #[error("reminder {reminder_id} does not belong to user {user_id}")]
    Forbidden {
        reminder_id: String,
        user_id: String,
    },

    /// Notifier boundary failed. Does not roll back the scheduler's state transition.
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    /// Store unavailable. Propagated for user-visible mutations, logged for background fires.
    #[error("persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
