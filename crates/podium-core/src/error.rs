//! Error types for Podium Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: bad tenant name, bad upload header, bad score cell,
    /// upload against a finished competition.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate tenant name: {0}")]
    DuplicateTenant(String),

    // Not-found errors: a missing resource, not a malformed request
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("competition not found: {0}")]
    CompetitionNotFound(String),

    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("player is disqualified: {0}")]
    Disqualified(String),

    /// The per-tenant lock could not be acquired within the deadline. The
    /// guarded read or write was not started; callers may retry.
    #[error("tenant lock timed out: {0}")]
    LockTimeout(String),

    /// The ID dispenser exhausted its retry budget on write conflicts.
    #[error("id generation failed after retries: {0}")]
    IdExhausted(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error names a missing resource rather than a bad request
    /// or a server-side fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TenantNotFound(_) | Error::CompetitionNotFound(_) | Error::PlayerNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
