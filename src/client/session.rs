//! Client connection session
//!
//! Owns one accepted stream and exposes blocking frame reads and writes over it.
//! The read and write halves are locked independently so a reader task and a
//! writer task can use the same session at once. Closing the session wakes
//! any read, write or [`ConnectionSession::closed`] wait that is in flight.

use log::warn;
use std::net::SocketAddr;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};

use crate::error::SessionError;
use crate::protocol::{decode, write_frame};

/// One client connection, framed.
pub struct ConnectionSession {
    peer_addr: SocketAddr,
    reader: Mutex<Option<BufReader<OwnedReadHalf>>>,
    writer: Mutex<Option<BufWriter<OwnedWriteHalf>>>,
    closed: watch::Sender<bool>,
}

impl ConnectionSession {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            peer_addr,
            reader: Mutex::new(Some(BufReader::new(read_half))),
            writer: Mutex::new(Some(BufWriter::new(write_half))),
            closed: watch::Sender::new(false),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Waits for one full frame.
    ///
    /// A clean end of stream, or a local [`close`](Self::close), yields
    /// `ConnectionClosed`.
    pub async fn receive_frame(&self) -> Result<String, SessionError> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Err(SessionError::ConnectionClosed);
        };

        tokio::select! {
            _ = self.closed() => Err(SessionError::ConnectionClosed),
            frame = decode(reader) => match frame? {
                Some(text) => Ok(text),
                None => Err(SessionError::ConnectionClosed),
            },
        }
    }

    /// Writes and flushes one frame.
    pub async fn send_frame(&self, text: &str) -> Result<(), SessionError> {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(SessionError::ConnectionClosed);
        };

        tokio::select! {
            _ = self.closed() => Err(SessionError::ConnectionClosed),
            sent = write_frame(writer, text) => sent.map_err(SessionError::from),
        }
    }

    /// Resolves once the session has been closed.
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        // The sender lives in `self`, so this only errors if `self` is gone.
        let _ = closed.wait_for(|c| *c).await;
    }

    /// Releases both halves of the stream.
    ///
    /// Safe to call more than once; calls after the first return `true`.
    /// Returns `false` if shutting down the write half failed; the read half
    /// is released regardless.
    pub async fn close(&self) -> bool {
        if self.closed.send_replace(true) {
            return true;
        }

        let mut success = true;

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                warn!("Failed to shut down stream to {}: {}", self.peer_addr, e);
                success = false;
            }
        }

        drop(self.reader.lock().await.take());

        success
    }
}
