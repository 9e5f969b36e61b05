//! Utility modules
//!
//! Logging bootstrap and network helpers.

pub mod logging;
pub mod network;

pub use logging::setup_logging;
pub use network::bind_listener;
