//! Server control surface
//!
//! Start/stop entry points for a host (GUI, binary, tests). A stopped
//! [`Server`] cannot be restarted, so each start builds a fresh one.

use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::client::ClientRegistry;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::core::Server;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

pub struct ServerControl {
    config: ServerConfig,
    current: Mutex<Option<Arc<Server>>>,
    // Registries of earlier, stopped servers that may still hold clients.
    retired: Mutex<Vec<Arc<ClientRegistry>>>,
    running: AtomicBool,
}

impl ServerControl {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            current: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    pub async fn start_server(&self) -> Result<StartOutcome, ServerError> {
        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(|s| s.is_running()) {
            info!("Server is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let server = Server::new(self.config.clone());
        server.start().await?;
        if let Some(previous) = current.replace(server) {
            self.retire(Arc::clone(previous.registry())).await;
        }
        self.running.store(true, Ordering::Release);
        Ok(StartOutcome::Started)
    }

    /// Stops accepting; clients already connected keep their sessions.
    pub async fn stop_server(&self) -> StopOutcome {
        let current = self.current.lock().await;
        let Some(server) = current.as_ref().filter(|s| s.is_running()) else {
            info!("Server is not running");
            return StopOutcome::NotRunning;
        };

        self.running.store(false, Ordering::Release);
        server.stop().await;
        StopOutcome::Stopped
    }

    /// Closes every client this control has accepted, including those
    /// still attached to servers that were stopped and replaced.
    pub async fn disconnect_clients(&self) {
        let retired: Vec<_> = self.retired.lock().await.drain(..).collect();
        for registry in retired {
            registry.disconnect_all().await;
        }

        if let Some(server) = self.current.lock().await.as_ref() {
            server.registry().disconnect_all().await;
        }
    }

    async fn retire(&self, registry: Arc<ClientRegistry>) {
        let mut retired = self.retired.lock().await;
        let mut kept = Vec::with_capacity(retired.len() + 1);
        for old in retired.drain(..) {
            if !old.is_empty().await {
                kept.push(old);
            }
        }
        if !registry.is_empty().await {
            kept.push(registry);
        }
        *retired = kept;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match self.current.lock().await.as_ref() {
            Some(server) => server.local_addr().await,
            None => None,
        }
    }

    /// The most recently started server, running or not.
    pub async fn server(&self) -> Option<Arc<Server>> {
        self.current.lock().await.clone()
    }
}
