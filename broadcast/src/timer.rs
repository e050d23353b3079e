//! Refresh timers, one per open session.

use rollcall_types::SessionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

struct TimerHandle {
    closed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Drives token rotation for open sessions.
///
/// Each timer re-checks its closed flag after every interval tick, and
/// [`stop`](RefreshTimers::stop) flips the flag before aborting the task.
/// Callers who need a hard no-ticks-after-stop guarantee additionally gate
/// the tick body on their own session state, since an abort only lands at an
/// await point.
pub struct RefreshTimers {
    timers: Mutex<HashMap<SessionId, TimerHandle>>,
}

impl RefreshTimers {
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, TimerHandle>> {
        self.timers.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("refresh timer registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Start a timer for `session`, invoking `tick` once per interval.
    /// Restarting an already-timed session replaces the old timer.
    pub fn start<F>(&self, session: SessionId, every: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        let closed = Arc::new(AtomicBool::new(false));
        let flag = closed.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick of a tokio interval fires immediately; the
            // caller already issued the initial token, so skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                tick();
            }
        });

        if let Some(previous) = self.lock().insert(session, TimerHandle { closed, task }) {
            previous.closed.store(true, Ordering::SeqCst);
            previous.task.abort();
        }
    }

    /// Stop `session`'s timer. Returns `false` if none was running.
    pub fn stop(&self, session: SessionId) -> bool {
        match self.lock().remove(&session) {
            Some(handle) => {
                handle.closed.store(true, Ordering::SeqCst);
                handle.task.abort();
                true
            }
            None => false,
        }
    }

    /// Stop every timer; used on shutdown.
    pub fn stop_all(&self) {
        let mut timers = self.lock();
        for (_, handle) in timers.drain() {
            handle.closed.store(true, Ordering::SeqCst);
            handle.task.abort();
        }
    }
}

impl Default for RefreshTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RefreshTimers {
    fn drop(&mut self) {
        self.stop_all();
    }
}
