//! Server core functionality
//!
//! The listener loop, the periodic roster announcer, and the
//! start/stop control surface.

pub mod announcer;
pub mod control;
pub mod core;

pub use announcer::RosterAnnouncer;
pub use control::{ServerControl, StartOutcome, StopOutcome};
pub use self::core::{ListenerState, Server};
