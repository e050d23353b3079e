//! Session metadata read from the external catalog.

use crate::{GeoPoint, IssuerId, SeriesId, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

/// One scheduled meeting instance, as the catalog describes it.
///
/// The engine never creates or deletes sessions; it reads the anchor and the
/// scheduled window, and the lifecycle manager keys its single active token
/// off `session`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session: SessionId,
    /// Instructor who owns the attendance window.
    pub instructor: IssuerId,
    /// Geofence anchor. `None` means the room has no registered coordinates;
    /// checking in against such a session is a `MissingLocation` reject, never
    /// a trivial pass.
    pub anchor: Option<GeoPoint>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    /// The recurring course meeting this instance belongs to.
    pub series: SeriesId,
}

impl SessionInfo {
    /// Whether the scheduled window covers `now` (inclusive bounds).
    pub fn scheduled_at(&self, now: Timestamp) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }
}
