//! Error handlers
//!
//! Maps errors to the log severity the relay reports them at.

use log::{error, info, log, warn, Level};

use crate::error::types::{ChatServerError, SessionError};

/// Severity a session-ending condition is reported at.
///
/// A clean peer close is routine; anything else means the stream broke.
pub fn session_end_level(err: &SessionError) -> Level {
    match err {
        SessionError::ConnectionClosed => Level::Info,
        SessionError::ConnectionError(_) | SessionError::Protocol(_) => Level::Warn,
    }
}

/// Log the condition that ended one side of a client session
pub fn log_session_end(client: &str, side: &str, err: &SessionError) {
    match err {
        SessionError::ConnectionClosed => info!("{} {}: connection closed", client, side),
        other => log!(session_end_level(other), "{} {}: {}", client, side, other),
    }
}

/// Handle a top-level chat server error
pub fn handle_error(err: &ChatServerError) {
    match err {
        ChatServerError::Client(e) => warn!("Chat Server Error: {}", e),
        other => error!("Chat Server Error: {}", other),
    }
}
