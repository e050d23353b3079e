//! Check-in window orchestration.
//!
//! [`CheckInEngine`] ties the pieces together: it opens a verification
//! window for a session, keeps the session's token rotating, pushes every
//! attempt through the rate guard → token validation → geofence → risk
//! scoring pipeline, persists the audit trail, and fans events out to the
//! session's subscribers. All storage and caching arrives through traits,
//! so the whole engine runs against in-memory backends in tests.

pub mod error;
pub mod logging;
mod window;

pub use error::EngineError;
pub use logging::{init_logging, LogFormat};

use rollcall_broadcast::{RefreshTimers, SessionEvent, SessionRooms};
use rollcall_cache::TtlCache;
use rollcall_crypto::{sha256_hex, TokenSecret};
use rollcall_guard::ReplayGuard;
use rollcall_risk::{AttemptContext, RiskEngine};
use rollcall_store::{AlertStore, ScanStore, SessionStore, TokenAuditStore};
use rollcall_token::{SignedToken, TokenManager, Validation};
use rollcall_types::{
    Alert, CheckInContext, EngineParams, IssuerId, RejectReason, RiskTier, ScanAttempt,
    ScanOutcome, SessionId, SessionInfo, SubjectId, TierCounts, Timestamp,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use window::WindowRegistry;

/// The storage backends the engine writes through.
#[derive(Clone)]
pub struct EngineStores {
    pub sessions: Arc<dyn SessionStore>,
    pub scans: Arc<dyn ScanStore>,
    pub token_audit: Arc<dyn TokenAuditStore>,
    pub alerts: Arc<dyn AlertStore>,
}

/// Returned by [`CheckInEngine::open_window`]; everything a client needs to
/// render the first code and schedule its refresh.
#[derive(Clone, Debug)]
pub struct OpenedWindow {
    pub token: SignedToken,
    pub expires_at: Timestamp,
    pub refresh_interval_ms: u64,
}

/// The per-attempt verdict handed back to the caller.
#[derive(Clone, Debug, Serialize)]
pub struct CheckInOutcome {
    pub accepted: bool,
    pub risk_score: u8,
    pub tier: RiskTier,
    pub reason: Option<RejectReason>,
    /// Metres from the session anchor, whenever both coordinates were known.
    pub distance_m: Option<f64>,
}

/// Returned by [`CheckInEngine::close_window`].
#[derive(Clone, Debug, Serialize)]
pub struct WindowSummary {
    pub session: SessionId,
    pub counts: TierCounts,
    pub opened_at: Timestamp,
    pub closed_at: Timestamp,
}

pub struct CheckInEngine {
    params: EngineParams,
    stores: EngineStores,
    cache: Arc<dyn TtlCache>,
    tokens: TokenManager,
    risk: RiskEngine,
    guard: ReplayGuard,
    rooms: SessionRooms,
    timers: RefreshTimers,
    windows: WindowRegistry,
}

impl CheckInEngine {
    pub fn new(
        params: EngineParams,
        secret: TokenSecret,
        cache: Arc<dyn TtlCache>,
        stores: EngineStores,
    ) -> Result<Arc<Self>, EngineError> {
        params.validate().map_err(EngineError::Config)?;
        let tokens = TokenManager::new(
            cache.clone(),
            stores.sessions.clone(),
            stores.token_audit.clone(),
            secret,
            params.token_validity_secs,
        );
        Ok(Arc::new(Self {
            cache,
            risk: RiskEngine::from_params(&params),
            guard: ReplayGuard::new(params.rate_window_secs, params.rate_max_attempts),
            rooms: SessionRooms::new(64),
            timers: RefreshTimers::new(),
            windows: WindowRegistry::new(),
            tokens,
            stores,
            params,
        }))
    }

    /// Join a session's event stream.
    pub fn subscribe(&self, session: SessionId) -> broadcast::Receiver<SessionEvent> {
        self.rooms.subscribe(session)
    }

    /// Open the check-in window for `session` and start token rotation.
    ///
    /// Only the session's instructor may open it, and a session can have at
    /// most one window at a time.
    pub fn open_window(
        self: &Arc<Self>,
        session: SessionId,
        issuer: IssuerId,
        now: Timestamp,
    ) -> Result<OpenedWindow, EngineError> {
        let info = self.session(session)?;
        if info.instructor != issuer {
            return Err(EngineError::NotSessionInstructor(session));
        }

        self.windows.open(session, issuer, now)?;
        let issued = match self.tokens.issue(session, issuer, now) {
            Ok(issued) => issued,
            Err(err) => {
                // Roll the registration back so a retry is possible.
                let _ = self.windows.close(session, issuer);
                return Err(err.into());
            }
        };

        let refresh_interval_ms = self.params.refresh_interval_ms();
        self.publish_refresh(session, &issued.token, issued.expires_at);

        let engine = Arc::downgrade(self);
        self.timers.start(
            session,
            Duration::from_millis(refresh_interval_ms),
            move || {
                if let Some(engine) = engine.upgrade() {
                    engine.rotate(session, issuer);
                }
            },
        );

        tracing::info!(%session, %issuer, "check-in window opened");
        Ok(OpenedWindow {
            token: issued.token,
            expires_at: issued.expires_at,
            refresh_interval_ms,
        })
    }

    /// One rotation tick. Runs under the window registry lock so a rotation
    /// can never publish after `close_window` has returned.
    fn rotate(&self, session: SessionId, issuer: IssuerId) {
        let now = Timestamp::now();
        let ran = self.windows.with_open(session, |_| {
            match self.tokens.refresh(session, issuer, now) {
                Ok(issued) => self.publish_refresh(session, &issued.token, issued.expires_at),
                Err(err) => tracing::warn!(%session, %err, "token rotation failed"),
            }
        });
        if ran.is_none() {
            tracing::trace!(%session, "rotation tick after close, dropped");
        }

        // Registry upkeep rides the rotation cadence: reclaim consumed-sets
        // from superseded tokens and forget subjects whose rate window has
        // fully aged out.
        if let Err(err) = self.cache.purge_expired(now) {
            tracing::warn!(%err, "cache purge failed");
        }
        self.guard.prune(now);
    }

    fn publish_refresh(&self, session: SessionId, token: &SignedToken, expires_at: Timestamp) {
        self.rooms.publish(
            session,
            SessionEvent::TokenRefreshed {
                session,
                token: token.as_str().to_string(),
                expires_at,
                refresh_interval_ms: self.params.refresh_interval_ms(),
            },
        );
    }

    /// Verify one scan and persist the attempt.
    ///
    /// Pipeline order is fixed: rate guard, token validation, geofence, risk
    /// scoring. Security rejections (tampered, expired, mismatched, reused)
    /// short-circuit with their fixed risk flag and never reach the scorer.
    /// Every attempt except a rate-limited one lands in the scan store.
    pub fn submit_check_in(
        &self,
        token: &str,
        session: SessionId,
        subject: SubjectId,
        ctx: &CheckInContext,
        now: Timestamp,
    ) -> Result<CheckInOutcome, EngineError> {
        if let Err(reason) = self.guard.check(subject, now) {
            // Back-off guidance only; no audit row for throttled traffic.
            tracing::debug!(%session, %subject, "check-in rate limited");
            return Ok(CheckInOutcome {
                accepted: false,
                risk_score: reason.risk_flag(),
                tier: RiskTier::from_score(reason.risk_flag()),
                reason: Some(reason),
                distance_m: None,
            });
        }

        let info = self.session(session)?;
        let digest = sha256_hex(token.as_bytes());
        let distance_m = match (info.anchor, ctx.point) {
            (Some(anchor), Some(point)) => Some(rollcall_geo::distance_m(anchor, point)),
            _ => None,
        };

        match self.tokens.validate(token, session, subject, now)? {
            Validation::Valid(_) => {}
            Validation::Rejected(reason) => {
                return self.record_rejection(&info, subject, digest, ctx, distance_m, reason, now);
            }
        }

        let distance_m = match rollcall_geo::check(
            info.anchor,
            ctx.point,
            self.params.geofence_tolerance_m,
        ) {
            Ok(pass) => pass.distance_m,
            Err(reason) => {
                return self.record_rejection(&info, subject, digest, ctx, distance_m, reason, now);
            }
        };

        let assessment = self.risk.assess(
            self.stores.scans.as_ref(),
            &AttemptContext {
                subject,
                series: info.series,
                session_starts_at: info.starts_at,
                point: ctx.point,
                device_hash: ctx.device_hash.clone(),
                net_addr: ctx.net_addr.clone(),
            },
            now,
        );

        let attempt = ScanAttempt {
            subject,
            session: info.session,
            token_digest: digest,
            point: ctx.point,
            device_hash: ctx.device_hash.clone(),
            net_addr: ctx.net_addr.clone(),
            distance_m: Some(distance_m),
            risk_score: assessment.score,
            tier: assessment.tier,
            outcome: ScanOutcome::Accepted,
            recorded_at: now,
        };
        self.finish_attempt(&attempt)?;

        tracing::info!(
            %session,
            %subject,
            risk_score = assessment.score,
            tier = %assessment.tier,
            "check-in accepted"
        );
        Ok(CheckInOutcome {
            accepted: true,
            risk_score: assessment.score,
            tier: assessment.tier,
            reason: None,
            distance_m: Some(distance_m),
        })
    }

    /// Close the window: stop rotation, kill the live token, publish the
    /// tally, drop the room.
    pub fn close_window(
        &self,
        session: SessionId,
        issuer: IssuerId,
        now: Timestamp,
    ) -> Result<WindowSummary, EngineError> {
        let state = self.windows.close(session, issuer)?;
        self.timers.stop(session);
        self.tokens.invalidate(session, issuer, now)?;
        self.guard.prune(now);

        self.rooms.publish(
            session,
            SessionEvent::WindowClosed {
                session,
                counts: state.counts,
            },
        );
        self.rooms.close(session);

        tracing::info!(%session, %issuer, attempts = state.counts.total(), "check-in window closed");
        Ok(WindowSummary {
            session,
            counts: state.counts,
            opened_at: state.opened_at,
            closed_at: now,
        })
    }

    fn session(&self, session: SessionId) -> Result<SessionInfo, EngineError> {
        self.stores
            .sessions
            .session_info(session)?
            .ok_or(EngineError::SessionNotFound(session))
    }

    #[allow(clippy::too_many_arguments)]
    fn record_rejection(
        &self,
        info: &SessionInfo,
        subject: SubjectId,
        token_digest: String,
        ctx: &CheckInContext,
        distance_m: Option<f64>,
        reason: RejectReason,
        now: Timestamp,
    ) -> Result<CheckInOutcome, EngineError> {
        let flag = reason.risk_flag();
        let tier = RiskTier::from_score(flag);
        let attempt = ScanAttempt {
            subject,
            session: info.session,
            token_digest,
            point: ctx.point,
            device_hash: ctx.device_hash.clone(),
            net_addr: ctx.net_addr.clone(),
            distance_m,
            risk_score: flag,
            tier,
            outcome: ScanOutcome::Rejected {
                reason: reason.clone(),
            },
            recorded_at: now,
        };
        self.finish_attempt(&attempt)?;

        tracing::info!(
            session = %info.session,
            %subject,
            code = reason.code(),
            "check-in rejected"
        );
        Ok(CheckInOutcome {
            accepted: false,
            risk_score: flag,
            tier,
            reason: Some(reason),
            distance_m,
        })
    }

    /// Persist the attempt, tally it, and push the events.
    fn finish_attempt(&self, attempt: &ScanAttempt) -> Result<(), EngineError> {
        self.stores.scans.append_scan(attempt)?;
        self.windows.record(attempt.session, attempt.tier);

        self.rooms.publish(
            attempt.session,
            SessionEvent::CheckInRecorded {
                session: attempt.session,
                subject: attempt.subject,
                accepted: attempt.outcome.is_accepted(),
                risk_score: attempt.risk_score,
                tier: attempt.tier,
            },
        );

        if attempt.tier.raises_alert() {
            let alert = Alert {
                session: attempt.session,
                subject: attempt.subject,
                token_digest: attempt.token_digest.clone(),
                risk_score: attempt.risk_score,
                tier: attempt.tier,
                raised_at: attempt.recorded_at,
            };
            self.stores.alerts.append_alert(&alert)?;
            self.rooms.publish(
                attempt.session,
                SessionEvent::AlertRaised {
                    session: attempt.session,
                    subject: attempt.subject,
                    risk_score: attempt.risk_score,
                    tier: attempt.tier,
                },
            );
            tracing::warn!(
                session = %attempt.session,
                subject = %attempt.subject,
                risk_score = attempt.risk_score,
                tier = %attempt.tier,
                "high-risk check-in flagged for review"
            );
        }
        Ok(())
    }
}
