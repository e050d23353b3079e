//! End-to-end window lifecycle and check-in pipeline tests, all against the
//! in-memory backends.

use rollcall_broadcast::SessionEvent;
use rollcall_cache::MemoryTtlCache;
use rollcall_crypto::TokenSecret;
use rollcall_engine::{CheckInEngine, EngineError, EngineStores};
use rollcall_store::{
    AttendanceCounts, DeviceUsage, LocationCluster, MemoryStore, NetworkUsage, ScanSample,
    ScanStore, StoreError,
};
use rollcall_types::{
    CheckInContext, DeviceHash, EngineParams, GeoPoint, IssuerId, NetAddr, RejectReason,
    RiskTier, ScanAttempt, ScanOutcome, SeriesId, SessionId, SessionInfo, SubjectId, Timestamp,
};
use std::sync::Arc;

const T0: u64 = 100_000;
const SESSION: SessionId = SessionId::new(1);
const INSTRUCTOR: IssuerId = IssuerId::new(9);
const ANCHOR: GeoPoint = GeoPoint::new(6.5244, 3.3792);

// One degree of latitude is about 111.32 km.
const LAT_200M: f64 = 200.0 / 111_320.0;
const LAT_2KM: f64 = 2_000.0 / 111_320.0;

fn secret() -> TokenSecret {
    TokenSecret::new(*b"rollcall-test-secret-0123456789a")
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_session(SessionInfo {
        session: SESSION,
        instructor: INSTRUCTOR,
        anchor: Some(ANCHOR),
        starts_at: Timestamp::new(T0),
        ends_at: Timestamp::new(T0 + 4_000),
        series: SeriesId::new(10),
    });
    store
}

fn engine_with(store: Arc<MemoryStore>) -> Arc<CheckInEngine> {
    CheckInEngine::new(
        EngineParams::defaults(),
        secret(),
        Arc::new(MemoryTtlCache::new()),
        EngineStores {
            sessions: store.clone(),
            scans: store.clone(),
            token_audit: store.clone(),
            alerts: store,
        },
    )
    .unwrap()
}

fn setup() -> (Arc<CheckInEngine>, Arc<MemoryStore>) {
    let store = seeded_store();
    (engine_with(store.clone()), store)
}

fn ctx_at(point: Option<GeoPoint>) -> CheckInContext {
    CheckInContext {
        point,
        device_hash: DeviceHash::new("dev-7"),
        net_addr: NetAddr::new("192.0.2.10"),
    }
}

fn history(store: &MemoryStore, at: u64, point: GeoPoint) {
    store.seed_scan(ScanAttempt {
        subject: SubjectId::new(7),
        session: SESSION,
        token_digest: "00".repeat(32),
        point: Some(point),
        device_hash: DeviceHash::new("dev-7"),
        net_addr: NetAddr::new("192.0.2.10"),
        distance_m: Some(2.0),
        risk_score: 0,
        tier: RiskTier::Minimal,
        outcome: ScanOutcome::Accepted,
        recorded_at: Timestamp::new(at),
    });
}

#[tokio::test]
async fn accepted_check_in_reports_score_tier_and_distance() {
    let (engine, store) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();
    assert_eq!(opened.expires_at, Timestamp::new(T0 + 25));
    assert_eq!(opened.refresh_interval_ms, 20_000);

    let outcome = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 10),
        )
        .unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.reason, None);
    assert_eq!(outcome.tier, RiskTier::Minimal);
    assert!(outcome.distance_m.unwrap() < 1.0);

    let scans = store.scans();
    assert_eq!(scans.len(), 1);
    assert!(scans[0].outcome.is_accepted());
    assert_eq!(scans[0].token_digest, opened.token.digest());
}

#[tokio::test]
async fn second_attempt_by_same_subject_is_already_used() {
    let (engine, store) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();

    engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 10),
        )
        .unwrap();
    let second = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 12),
        )
        .unwrap();

    assert!(!second.accepted);
    assert_eq!(second.reason, Some(RejectReason::AlreadyUsed));
    assert_eq!(second.risk_score, 100);
    assert_eq!(second.tier, RiskTier::Critical);

    // A different subject can still use the live token.
    let other = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(8),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 14),
        )
        .unwrap();
    assert!(other.accepted);

    // The replayed attempt was critical, so it raised an alert.
    let alerts = store.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].subject, SubjectId::new(7));
    assert_eq!(alerts[0].risk_score, 100);
}

#[tokio::test]
async fn expired_token_rejected_regardless_of_geofence() {
    let (engine, _) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();

    let outcome = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 30),
        )
        .unwrap();

    assert_eq!(outcome.reason, Some(RejectReason::ExpiredToken));
    assert_eq!(outcome.risk_score, 100);
}

#[tokio::test]
async fn out_of_range_reports_the_distance() {
    let (engine, store) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();

    let far = GeoPoint::new(ANCHOR.lat + LAT_200M, ANCHOR.lon);
    let outcome = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(far)),
            Timestamp::new(T0 + 10),
        )
        .unwrap();

    assert!(!outcome.accepted);
    assert_eq!(outcome.risk_score, 85);
    let distance = outcome.distance_m.unwrap();
    assert!((195.0..=205.0).contains(&distance), "distance {distance}");
    match outcome.reason {
        Some(RejectReason::OutOfRange {
            distance_m,
            tolerance_m,
        }) => {
            assert!((195.0..=205.0).contains(&distance_m));
            assert_eq!(tolerance_m, 50.0);
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }

    // The rejection is in the audit trail, distance included.
    let scans = store.scans();
    assert_eq!(scans.len(), 1);
    assert!((195.0..=205.0).contains(&scans[0].distance_m.unwrap()));
}

#[tokio::test]
async fn missing_location_is_a_hard_reject() {
    let (engine, _) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();

    let outcome = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(None),
            Timestamp::new(T0 + 10),
        )
        .unwrap();

    assert_eq!(outcome.reason, Some(RejectReason::MissingLocation));
    assert_eq!(outcome.distance_m, None);
}

#[tokio::test]
async fn eleventh_attempt_in_the_window_is_rate_limited() {
    let (engine, store) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();

    for i in 0..10 {
        let outcome = engine
            .submit_check_in(
                opened.token.as_str(),
                SESSION,
                SubjectId::new(7),
                &ctx_at(Some(ANCHOR)),
                Timestamp::new(T0 + 10 + i),
            )
            .unwrap();
        assert!(!matches!(
            outcome.reason,
            Some(RejectReason::RateLimited { .. })
        ));
    }

    let eleventh = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 20),
        )
        .unwrap();
    match eleventh.reason {
        Some(RejectReason::RateLimited { retry_after_secs }) => {
            assert!((1..=60).contains(&retry_after_secs));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // Throttled attempts are not persisted.
    assert_eq!(store.scans().len(), 10);
}

#[tokio::test]
async fn impossible_movement_in_history_raises_the_composite() {
    let store = seeded_store();
    // Two scans 2 km apart only three minutes apart, plus an older scan at
    // the anchor so the anchor cluster dominates.
    let far = GeoPoint::new(ANCHOR.lat + LAT_2KM, ANCHOR.lon);
    history(&store, T0 - 86_400, ANCHOR);
    history(&store, T0 - 3_600, ANCHOR);
    history(&store, T0 - 3_420, far);
    let engine = engine_with(store.clone());

    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();
    let outcome = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 10),
        )
        .unwrap();

    // Anomaly contributes 35 * 0.20 = 7; the other factors stay at zero for
    // this otherwise-consistent subject.
    assert!(outcome.accepted);
    assert_eq!(outcome.risk_score, 7);
}

#[tokio::test]
async fn concurrent_duplicate_submissions_accept_exactly_once() {
    let (engine, store) = setup();
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();
    let token = opened.token.as_str().to_string();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let token = token.clone();
        handles.push(std::thread::spawn(move || {
            engine
                .submit_check_in(
                    &token,
                    SESSION,
                    SubjectId::new(7),
                    &ctx_at(Some(ANCHOR)),
                    Timestamp::new(T0 + 10),
                )
                .unwrap()
        }));
    }

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|o| o.accepted).count(), 1);
    assert!(outcomes
        .iter()
        .filter(|o| !o.accepted)
        .all(|o| o.reason == Some(RejectReason::AlreadyUsed)));

    let accepted_rows = store
        .scans()
        .into_iter()
        .filter(|s| s.outcome.is_accepted())
        .count();
    assert_eq!(accepted_rows, 1);
}

/// A scan store whose history reads always fail. Appends still work, so the
/// audit trail survives while every analyzer degrades.
struct OfflineHistory(Arc<MemoryStore>);

impl ScanStore for OfflineHistory {
    fn append_scan(&self, attempt: &ScanAttempt) -> Result<(), StoreError> {
        self.0.append_scan(attempt)
    }
    fn device_usage(
        &self,
        _subject: SubjectId,
        _since: Timestamp,
    ) -> Result<Vec<DeviceUsage>, StoreError> {
        Err(StoreError::Backend("history offline".into()))
    }
    fn location_clusters(
        &self,
        _subject: SubjectId,
        _since: Timestamp,
    ) -> Result<Vec<LocationCluster>, StoreError> {
        Err(StoreError::Backend("history offline".into()))
    }
    fn network_usage(
        &self,
        _subject: SubjectId,
        _since: Timestamp,
    ) -> Result<Vec<NetworkUsage>, StoreError> {
        Err(StoreError::Backend("history offline".into()))
    }
    fn attendance_counts(
        &self,
        _subject: SubjectId,
        _series: SeriesId,
        _since: Timestamp,
    ) -> Result<AttendanceCounts, StoreError> {
        Err(StoreError::Backend("history offline".into()))
    }
    fn recent_scans(
        &self,
        _subject: SubjectId,
        _since: Timestamp,
        _limit: usize,
    ) -> Result<Vec<ScanSample>, StoreError> {
        Err(StoreError::Backend("history offline".into()))
    }
}

#[tokio::test]
async fn degraded_analyzers_never_block_a_valid_check_in() {
    let store = seeded_store();
    let engine = CheckInEngine::new(
        EngineParams::defaults(),
        secret(),
        Arc::new(MemoryTtlCache::new()),
        EngineStores {
            sessions: store.clone(),
            scans: Arc::new(OfflineHistory(store.clone())),
            token_audit: store.clone(),
            alerts: store.clone(),
        },
    )
    .unwrap();

    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();
    let outcome = engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 10),
        )
        .unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.risk_score, 0);
    assert_eq!(outcome.tier, RiskTier::Minimal);
    assert_eq!(store.scans().len(), 1);
}

#[tokio::test]
async fn close_window_summarizes_notifies_and_invalidates() {
    let (engine, store) = setup();
    let mut events = engine.subscribe(SESSION);
    let opened = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();

    engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(7),
            &ctx_at(Some(ANCHOR)),
            Timestamp::new(T0 + 10),
        )
        .unwrap();
    let far = GeoPoint::new(ANCHOR.lat + LAT_200M, ANCHOR.lon);
    engine
        .submit_check_in(
            opened.token.as_str(),
            SESSION,
            SubjectId::new(8),
            &ctx_at(Some(far)),
            Timestamp::new(T0 + 12),
        )
        .unwrap();

    let summary = engine
        .close_window(SESSION, INSTRUCTOR, Timestamp::new(T0 + 20))
        .unwrap();
    assert_eq!(summary.counts.minimal, 1);
    assert_eq!(summary.counts.critical, 1);
    assert_eq!(summary.counts.total(), 2);

    // The stale token is dead immediately.
    assert_eq!(
        store.token_audit()[0].status,
        rollcall_store::TokenStatus::Invalidated
    );

    // Event order: initial token, two outcomes, the alert for the
    // out-of-range attempt, then the closing tally; then the room is gone.
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::TokenRefreshed { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::CheckInRecorded { accepted: true, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::CheckInRecorded { accepted: false, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::AlertRaised { .. }
    ));
    match events.recv().await.unwrap() {
        SessionEvent::WindowClosed { counts, .. } => assert_eq!(counts.total(), 2),
        other => panic!("expected WindowClosed, got {other:?}"),
    }
    assert!(events.recv().await.is_err());
}

#[tokio::test]
async fn no_rotation_event_after_close_returns() {
    let store = seeded_store();
    let mut params = EngineParams::defaults();
    params.token_validity_secs = 2;
    params.refresh_interval_secs = 1;
    let engine = CheckInEngine::new(
        params,
        secret(),
        Arc::new(MemoryTtlCache::new()),
        EngineStores {
            sessions: store.clone(),
            scans: store.clone(),
            token_audit: store.clone(),
            alerts: store,
        },
    )
    .unwrap();

    let mut events = engine.subscribe(SESSION);
    engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();
    engine
        .close_window(SESSION, INSTRUCTOR, Timestamp::new(T0 + 1))
        .unwrap();

    // Give a straggling timer tick every chance to misbehave.
    tokio::time::sleep(std::time::Duration::from_millis(1_400)).await;

    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::TokenRefreshed { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::WindowClosed { .. }
    ));
    assert!(events.recv().await.is_err());
}

#[tokio::test]
async fn window_lifecycle_guards() {
    let (engine, _) = setup();

    let err = engine
        .open_window(SessionId::new(404), INSTRUCTOR, Timestamp::new(T0))
        .unwrap_err();
    assert!(matches!(err, EngineError::SessionNotFound(_)));

    let err = engine
        .open_window(SESSION, IssuerId::new(8), Timestamp::new(T0))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotSessionInstructor(_)));

    engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0))
        .unwrap();
    let err = engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0 + 1))
        .unwrap_err();
    assert!(matches!(err, EngineError::WindowAlreadyOpen(_)));

    let err = engine
        .close_window(SESSION, IssuerId::new(8), Timestamp::new(T0 + 2))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotWindowOwner(_)));

    engine
        .close_window(SESSION, INSTRUCTOR, Timestamp::new(T0 + 3))
        .unwrap();
    let err = engine
        .close_window(SESSION, INSTRUCTOR, Timestamp::new(T0 + 4))
        .unwrap_err();
    assert!(matches!(err, EngineError::WindowNotOpen(_)));

    // Reopening after a clean close is allowed.
    engine
        .open_window(SESSION, INSTRUCTOR, Timestamp::new(T0 + 5))
        .unwrap();
}
