//! Module `pump`
//!
//! A `ClientPump` is one connected participant: a [`ConnectionSession`], an
//! unbounded outbound queue, and the reader/writer task pair that moves
//! messages between them and the [`ClientRegistry`].

use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, mpsc};

use crate::client::registry::ClientRegistry;
use crate::client::session::ConnectionSession;
use crate::error::ClientError;
use crate::error::handlers::log_session_end;

/// Identifier assigned by the listener, unique per server instance.
pub type ClientId = u64;

pub struct ClientPump {
    id: ClientId,
    name: OnceLock<String>,
    session: ConnectionSession,
    outbound: mpsc::UnboundedSender<String>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    closing: AtomicBool,
}

impl ClientPump {
    pub fn new(id: ClientId, session: ConnectionSession) -> Arc<Self> {
        let (outbound, inbox) = mpsc::unbounded_channel();
        Arc::new(Self {
            id,
            name: OnceLock::new(),
            session,
            outbound,
            inbox: Mutex::new(Some(inbox)),
            closing: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.session.peer_addr()
    }

    /// Display name, once the first frame has been received.
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Name if known, otherwise the peer address; for log lines.
    pub fn label(&self) -> String {
        match self.name() {
            Some(name) => format!("{} ({})", name, self.peer_addr()),
            None => self.peer_addr().to_string(),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Queues `text` for delivery without waiting for it to be written.
    ///
    /// Only fails once the writer has gone away; a message queued just before
    /// termination may still be dropped silently.
    pub fn enqueue(&self, text: &str) -> Result<(), ClientError> {
        self.outbound
            .send(text.to_owned())
            .map_err(|_| ClientError::EnqueueFailure {
                client: self.label(),
            })
    }

    /// Closes the session, which wakes both loops so the pump terminates.
    pub async fn disconnect(&self) {
        self.session.close().await;
    }

    /// Runs the pump to completion.
    ///
    /// Reads the display name, then runs the reader and writer loops
    /// concurrently until both finish. Always ends deregistered.
    pub async fn run(self: Arc<Self>, registry: Arc<ClientRegistry>) {
        match self.session.receive_frame().await {
            Ok(name) if !name.trim().is_empty() => {
                let _ = self.name.set(name);
                info!("Client {} identified", self.label());
            }
            Ok(_) => {
                warn!("Client {} sent an empty name", self.peer_addr());
                self.terminate(&registry).await;
                return;
            }
            Err(e) => {
                log_session_end(&self.label(), "before naming", &e);
                self.terminate(&registry).await;
                return;
            }
        }

        let Some(inbox) = self.inbox.lock().await.take() else {
            warn!("Client {} pump started twice", self.label());
            return;
        };

        let reader = tokio::spawn(Arc::clone(&self).read_loop(Arc::clone(&registry)));
        let writer = tokio::spawn(Arc::clone(&self).write_loop(inbox, Arc::clone(&registry)));

        let (read_result, write_result) = tokio::join!(reader, writer);
        for result in [read_result, write_result] {
            if let Err(e) = result {
                warn!("Client {} loop task failed: {}", self.label(), e);
            }
        }

        self.terminate(&registry).await;
    }

    async fn read_loop(self: Arc<Self>, registry: Arc<ClientRegistry>) {
        let name = self.name().unwrap_or_default().to_owned();
        loop {
            match self.session.receive_frame().await {
                Ok(line) => {
                    debug!("{}: {}", name, line);
                    let relay = format!("{}: {}", name, line);
                    if !registry.broadcast_to_all(&relay).await {
                        warn!("Line from {} not relayed: too long", self.label());
                    }
                }
                Err(e) => {
                    if !self.is_terminated() {
                        log_session_end(&self.label(), "reader", &e);
                    }
                    break;
                }
            }
        }
        self.terminate(&registry).await;
    }

    async fn write_loop(
        self: Arc<Self>,
        mut inbox: mpsc::UnboundedReceiver<String>,
        registry: Arc<ClientRegistry>,
    ) {
        loop {
            let message = tokio::select! {
                _ = self.session.closed() => break,
                message = inbox.recv() => message,
            };
            let Some(message) = message else {
                break;
            };

            if let Err(e) = self.session.send_frame(&message).await {
                if !self.is_terminated() {
                    log_session_end(&self.label(), "writer", &e);
                }
                break;
            }
        }
        self.terminate(&registry).await;
    }

    /// Closes the session and deregisters, exactly once.
    async fn terminate(&self, registry: &ClientRegistry) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.session.close().await {
            info!("Session closed for {}", self.label());
        } else {
            warn!("Session for {} did not close cleanly", self.label());
        }
        registry.deregister(self.id).await;
    }
}
