use rollcall_cache::CacheError;
use rollcall_store::StoreError;
use rollcall_types::SessionId;
use thiserror::Error;

/// Infrastructure failures of the token lifecycle.
///
/// Rejections of an individual token are not errors; they travel as
/// [`rollcall_types::RejectReason`] inside [`crate::Validation`].
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("token payload codec: {0}")]
    Codec(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
