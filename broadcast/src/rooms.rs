//! Per-session broadcast rooms.

use crate::event::SessionEvent;
use rollcall_types::SessionId;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// One broadcast channel per open session.
///
/// Rooms are created lazily on first subscribe or publish and dropped on
/// [`close`](SessionRooms::close). Slow subscribers lag and lose events;
/// that is acceptable here because the scan records are authoritative.
pub struct SessionRooms {
    capacity: usize,
    rooms: Mutex<HashMap<SessionId, broadcast::Sender<SessionEvent>>>,
}

impl SessionRooms {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, broadcast::Sender<SessionEvent>>> {
        // A panic while holding the map cannot corrupt it; keep serving.
        self.rooms.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("session room registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Join a session's room, creating it if needed.
    pub fn subscribe(&self, session: SessionId) -> broadcast::Receiver<SessionEvent> {
        let mut rooms = self.lock();
        rooms
            .entry(session)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish into a session's room. Returns the number of receivers the
    /// event reached; zero when the room is absent or empty.
    pub fn publish(&self, session: SessionId, event: SessionEvent) -> usize {
        let rooms = self.lock();
        match rooms.get(&session) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop a session's room. Existing receivers observe a closed channel.
    pub fn close(&self, session: SessionId) {
        self.lock().remove(&session);
    }
}
