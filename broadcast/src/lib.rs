//! Push-side plumbing for live check-in windows.
//!
//! Two small registries: [`SessionRooms`] fans session events out to
//! subscribers over `tokio::sync::broadcast`, and [`RefreshTimers`] drives
//! the token rotation cadence for each open session. Neither holds business
//! state; both are owned by the engine and die with it.

pub mod event;
pub mod rooms;
pub mod timer;

pub use event::SessionEvent;
pub use rooms::SessionRooms;
pub use timer::RefreshTimers;
