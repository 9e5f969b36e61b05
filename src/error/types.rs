//! Error types
//!
//! Defines domain-specific error types for each layer of the chat relay.

use std::io;

use thiserror::Error;

use crate::server::ListenerState;

/// Frame codec errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame too large: {len} bytes (max {max})", max = u16::MAX)]
    FrameTooLarge { len: usize },
    #[error("Stream ended in the middle of a frame")]
    TruncatedStream,
    #[error("Frame payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Connection session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer closed the stream between frames, or the session was closed locally.
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection error: {0}")]
    ConnectionError(io::Error),
    #[error("Protocol error: {0}")]
    Protocol(FrameError),
}

impl From<FrameError> for SessionError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Io(e) => SessionError::ConnectionError(e),
            other => SessionError::Protocol(other),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::ConnectionError(error)
    }
}

/// Client module errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to enqueue message for client {client}")]
    EnqueueFailure { client: String },
}

/// Listener errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    BindFailure { addr: String, source: io::Error },
    #[error("Invalid listener state: {0:?}")]
    InvalidState(ListenerState),
}

/// General chat server error that encompasses all error types
#[derive(Debug, Error)]
pub enum ChatServerError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
