//! Token lifecycle: issue, refresh, validate, invalidate.

use crate::error::TokenError;
use crate::payload::{self, SignedToken, TokenPayload};
use rollcall_cache::{SetAdd, TtlCache};
use rollcall_crypto::{generate_nonce, TokenSecret};
use rollcall_store::{SessionStore, TokenAuditRecord, TokenAuditStore, TokenStatus};
use rollcall_types::{IssuerId, RejectReason, SessionId, SubjectId, Timestamp};
use std::sync::Arc;

/// A freshly issued (or refreshed) token.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: SignedToken,
    pub expires_at: Timestamp,
}

/// The identity a valid token vouches for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedCheckIn {
    pub session: SessionId,
    pub issuer: IssuerId,
}

/// Outcome of presenting a token: infrastructure failures are a separate
/// channel ([`TokenError`]), so rejections stay typed and loggable.
#[derive(Clone, Debug, PartialEq)]
pub enum Validation {
    Valid(ValidatedCheckIn),
    Rejected(RejectReason),
}

fn token_key(session: SessionId) -> String {
    format!("attn_token:{session}")
}

fn used_key(session: SessionId, nonce: &str) -> String {
    format!("attn_used:{session}:{nonce}")
}

/// Issues and validates the rotating per-session attendance token.
///
/// One cache key per session holds the current payload, so at most one token
/// is live per session; refreshing overwrites it, and a superseded token
/// fails the nonce-currency check even though its signature and expiry claim
/// are still good.
pub struct TokenManager {
    cache: Arc<dyn TtlCache>,
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn TokenAuditStore>,
    secret: TokenSecret,
    validity_secs: u64,
}

impl TokenManager {
    pub fn new(
        cache: Arc<dyn TtlCache>,
        sessions: Arc<dyn SessionStore>,
        audit: Arc<dyn TokenAuditStore>,
        secret: TokenSecret,
        validity_secs: u64,
    ) -> Self {
        Self {
            cache,
            sessions,
            audit,
            secret,
            validity_secs,
        }
    }

    /// Issue a fresh token for `session`, replacing any live one.
    pub fn issue(
        &self,
        session: SessionId,
        issuer: IssuerId,
        now: Timestamp,
    ) -> Result<IssuedToken, TokenError> {
        let Some(_info) = self.sessions.session_info(session)? else {
            return Err(TokenError::SessionNotFound(session));
        };

        let payload = TokenPayload {
            session,
            issuer,
            nonce: generate_nonce(),
            issued_at: now,
            expires_at: now.add_secs(self.validity_secs),
        };
        let token = payload::seal(&payload, &self.secret)?;
        let bytes =
            bincode::serialize(&payload).map_err(|e| TokenError::Codec(e.to_string()))?;
        self.cache
            .put(&token_key(session), bytes, self.validity_secs, now)?;
        self.audit.record_issued(&TokenAuditRecord {
            session,
            issuer,
            token_digest: token.digest(),
            nonce: payload.nonce.clone(),
            issued_at: payload.issued_at,
            expires_at: payload.expires_at,
            status: TokenStatus::Active,
        })?;

        tracing::debug!(%session, %issuer, expires_at = payload.expires_at.as_secs(), "token issued");
        Ok(IssuedToken {
            token,
            expires_at: payload.expires_at,
        })
    }

    /// Rotate the session's token. Same path as [`issue`](Self::issue); the
    /// session row is re-read so a deleted session stops the rotation.
    pub fn refresh(
        &self,
        session: SessionId,
        issuer: IssuerId,
        now: Timestamp,
    ) -> Result<IssuedToken, TokenError> {
        tracing::trace!(%session, "refreshing token");
        self.issue(session, issuer, now)
    }

    /// Validate a presented token for `subject` checking into `session`.
    ///
    /// Check order is fixed: signature, expiry claim, session binding, cache
    /// currency, then the atomic consumed-set add. Consumption is
    /// per-subject: one subject's acceptance leaves the token live for
    /// everyone else until it expires or rotates.
    pub fn validate(
        &self,
        token: &str,
        session: SessionId,
        subject: SubjectId,
        now: Timestamp,
    ) -> Result<Validation, TokenError> {
        let Some(claims) = payload::open(token, &self.secret) else {
            return Ok(Validation::Rejected(RejectReason::TamperedToken));
        };
        if claims.expired(now) {
            return Ok(Validation::Rejected(RejectReason::ExpiredToken));
        }
        if claims.session != session {
            return Ok(Validation::Rejected(RejectReason::SessionMismatch));
        }

        // The cache record is the source of truth for which nonce is
        // current. Absent record: TTL already reaped it (or the window
        // closed). Different nonce: this token was superseded by a refresh.
        let Some(bytes) = self.cache.get(&token_key(session), now)? else {
            return Ok(Validation::Rejected(RejectReason::ExpiredToken));
        };
        let current: TokenPayload =
            bincode::deserialize(&bytes).map_err(|e| TokenError::Codec(e.to_string()))?;
        if current.nonce != claims.nonce {
            return Ok(Validation::Rejected(RejectReason::ExpiredToken));
        }

        let remaining = claims.expires_at.as_secs().saturating_sub(now.as_secs()).max(1);
        let added = self.cache.add_to_set(
            &used_key(session, &claims.nonce),
            &subject.as_u64().to_string(),
            remaining,
            now,
        )?;
        if added == SetAdd::AlreadyPresent {
            return Ok(Validation::Rejected(RejectReason::AlreadyUsed));
        }

        Ok(Validation::Valid(ValidatedCheckIn {
            session: claims.session,
            issuer: claims.issuer,
        }))
    }

    /// Kill the session's live token immediately.
    pub fn invalidate(
        &self,
        session: SessionId,
        issuer: IssuerId,
        now: Timestamp,
    ) -> Result<(), TokenError> {
        if let Some(bytes) = self.cache.get(&token_key(session), now)? {
            if let Ok(current) = bincode::deserialize::<TokenPayload>(&bytes) {
                self.cache.delete(&used_key(session, &current.nonce))?;
            }
        }
        self.cache.delete(&token_key(session))?;
        self.audit.record_invalidated(session, now)?;
        tracing::debug!(%session, %issuer, "token invalidated");
        Ok(())
    }
}
