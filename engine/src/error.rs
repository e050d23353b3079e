use rollcall_store::StoreError;
use rollcall_token::TokenError;
use rollcall_types::SessionId;
use thiserror::Error;

/// Failures of the window orchestration layer.
///
/// Per-attempt rejections are not errors; they come back inside
/// [`crate::CheckInOutcome`] so the caller can report them to the subject.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine parameters: {0}")]
    Config(String),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("issuer is not the instructor for session {0}")]
    NotSessionInstructor(SessionId),

    #[error("session {0} already has an open check-in window")]
    WindowAlreadyOpen(SessionId),

    #[error("session {0} has no open check-in window")]
    WindowNotOpen(SessionId),

    #[error("issuer does not own the window for session {0}")]
    NotWindowOwner(SessionId),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
