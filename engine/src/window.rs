//! The open-window registry.

use crate::error::EngineError;
use rollcall_types::{IssuerId, RiskTier, SessionId, TierCounts, Timestamp};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug)]
pub(crate) struct WindowState {
    pub issuer: IssuerId,
    pub opened_at: Timestamp,
    pub counts: TierCounts,
}

/// Tracks which sessions currently accept check-ins.
///
/// Entries exist only between `open` and `close`; there is no ambient
/// global, the registry lives inside the engine that created it. The inner
/// lock also serializes refresh publication against close: a refresh runs
/// its publish under [`with_open`](WindowRegistry::with_open), so once
/// `close` has removed the entry no further refresh can slip out.
pub(crate) struct WindowRegistry {
    windows: Mutex<HashMap<SessionId, WindowState>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, WindowState>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("window registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn open(
        &self,
        session: SessionId,
        issuer: IssuerId,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        let mut windows = self.lock();
        if windows.contains_key(&session) {
            return Err(EngineError::WindowAlreadyOpen(session));
        }
        windows.insert(
            session,
            WindowState {
                issuer,
                opened_at: now,
                counts: TierCounts::default(),
            },
        );
        Ok(())
    }

    /// Run `f` while the window is provably open, holding the registry lock.
    /// Returns `None` if the window is not open.
    pub fn with_open<T>(&self, session: SessionId, f: impl FnOnce(&WindowState) -> T) -> Option<T> {
        let windows = self.lock();
        windows.get(&session).map(f)
    }

    /// Tally one recorded attempt. A missing window is tolerated: the
    /// attempt record itself has already been persisted.
    pub fn record(&self, session: SessionId, tier: RiskTier) {
        if let Some(state) = self.lock().get_mut(&session) {
            state.counts.record(tier);
        }
    }

    /// Remove the window after an ownership check.
    pub fn close(&self, session: SessionId, issuer: IssuerId) -> Result<WindowState, EngineError> {
        let mut windows = self.lock();
        match windows.remove(&session) {
            Some(state) if state.issuer == issuer => Ok(state),
            Some(state) => {
                windows.insert(session, state);
                Err(EngineError::NotWindowOwner(session))
            }
            None => Err(EngineError::WindowNotOpen(session)),
        }
    }

    #[cfg(test)]
    pub fn is_open(&self, session: SessionId) -> bool {
        self.lock().contains_key(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_open_rejected() {
        let registry = WindowRegistry::new();
        registry
            .open(SessionId::new(1), IssuerId::new(9), Timestamp::new(100))
            .unwrap();
        let err = registry
            .open(SessionId::new(1), IssuerId::new(9), Timestamp::new(101))
            .unwrap_err();
        assert!(matches!(err, EngineError::WindowAlreadyOpen(_)));
    }

    #[test]
    fn close_requires_the_opening_issuer() {
        let registry = WindowRegistry::new();
        registry
            .open(SessionId::new(1), IssuerId::new(9), Timestamp::new(100))
            .unwrap();

        let err = registry.close(SessionId::new(1), IssuerId::new(8)).unwrap_err();
        assert!(matches!(err, EngineError::NotWindowOwner(_)));
        assert!(registry.is_open(SessionId::new(1)));

        registry.close(SessionId::new(1), IssuerId::new(9)).unwrap();
        assert!(!registry.is_open(SessionId::new(1)));
    }

    #[test]
    fn closing_an_unopened_window_fails() {
        let registry = WindowRegistry::new();
        let err = registry.close(SessionId::new(5), IssuerId::new(9)).unwrap_err();
        assert!(matches!(err, EngineError::WindowNotOpen(_)));
    }

    #[test]
    fn tallies_accumulate_per_tier() {
        let registry = WindowRegistry::new();
        registry
            .open(SessionId::new(1), IssuerId::new(9), Timestamp::new(100))
            .unwrap();
        registry.record(SessionId::new(1), RiskTier::Minimal);
        registry.record(SessionId::new(1), RiskTier::Critical);
        registry.record(SessionId::new(1), RiskTier::Minimal);

        let state = registry.close(SessionId::new(1), IssuerId::new(9)).unwrap();
        assert_eq!(state.counts.minimal, 2);
        assert_eq!(state.counts.critical, 1);
        assert_eq!(state.counts.total(), 3);
    }

    #[test]
    fn with_open_sees_only_open_windows() {
        let registry = WindowRegistry::new();
        assert_eq!(registry.with_open(SessionId::new(1), |_| ()), None);
        registry
            .open(SessionId::new(1), IssuerId::new(9), Timestamp::new(100))
            .unwrap();
        assert_eq!(
            registry.with_open(SessionId::new(1), |w| w.issuer),
            Some(IssuerId::new(9))
        );
    }
}
