use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinHandle;

use crate::client::{ClientId, ClientPump, ClientRegistry, ConnectionSession};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::announcer::RosterAnnouncer;
use crate::utils::bind_listener;

/// Lifecycle of one listener. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Running,
    Stopped,
}

/// Resources that only exist while the listener is running
struct RunningParts {
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
    announcer: RosterAnnouncer,
}

pub struct Server {
    config: Arc<ServerConfig>,
    registry: Arc<ClientRegistry>,
    state: watch::Sender<ListenerState>,
    running: Mutex<Option<RunningParts>>,
    next_client_id: AtomicU64,
}

impl Server {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            registry: Arc::new(ClientRegistry::new()),
            state: watch::Sender::new(ListenerState::Idle),
            running: Mutex::new(None),
            next_client_id: AtomicU64::new(1),
        })
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ListenerState::Running
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Address actually bound, once running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Binds, arms the roster announcer and starts accepting in the background.
    ///
    /// Only valid from `Idle`. On `BindFailure` the server stays `Idle`.
    pub async fn start(self: &Arc<Self>) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        let state = self.state();
        if state != ListenerState::Idle {
            return Err(ServerError::InvalidState(state));
        }

        let addr = self.config.listen_address();
        let listener = bind_listener(&addr, self.config.backlog()).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::BindFailure { addr, source })?;

        self.state.send_replace(ListenerState::Running);
        info!(
            "Starting RAX chat server on {} (max {} clients)",
            local_addr, self.config.max_clients
        );

        let announcer = RosterAnnouncer::arm(
            Arc::clone(&self.registry),
            self.config.roster_interval(),
        );
        let accept_task = tokio::spawn(Arc::clone(self).accept_loop(listener));

        *running = Some(RunningParts {
            local_addr,
            accept_task,
            announcer,
        });
        Ok(())
    }

    /// Stops accepting and disarms the announcer.
    ///
    /// Connected clients are left running. A no-op unless `Running`.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if self.state() != ListenerState::Running {
            return;
        }

        // Flip the state first so the accept loop reads the wake-up as a stop.
        self.state.send_replace(ListenerState::Stopped);

        let Some(parts) = running.take() else {
            return;
        };
        if let Err(e) = parts.accept_task.await {
            warn!("Accept loop ended abnormally: {}", e);
        }
        parts.announcer.disarm(self.config.shutdown_grace()).await;

        info!("Server stopped listening on {}", parts.local_addr);
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let mut state = self.state.subscribe();
        let workers = Arc::new(Semaphore::new(self.config.max_clients));

        loop {
            let permit = tokio::select! {
                _ = stopped(&mut state) => break,
                permit = Arc::clone(&workers).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };

            let accepted = tokio::select! {
                _ = stopped(&mut state) => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    info!("Connection accepted: {}", addr);
                    let id = self.allocate_client_id();
                    let pump = ClientPump::new(id, ConnectionSession::new(stream, addr));
                    self.registry.register(Arc::clone(&pump)).await;

                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        pump.run(registry).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    if self.state() == ListenerState::Stopped {
                        break;
                    }
                    error!("Error accepting connection: {}", e);
                }
            }
        }

        debug!("Accept loop finished; closing listener");
        drop(listener);
    }

    fn allocate_client_id(&self) -> ClientId {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }
}

async fn stopped(state: &mut watch::Receiver<ListenerState>) {
    let _ = state.wait_for(|s| *s == ListenerState::Stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let server = Server::new(test_config());
        assert_eq!(server.state(), ListenerState::Idle);

        server.start().await.unwrap();
        assert!(server.is_running());
        assert!(server.local_addr().await.is_some());

        server.stop().await;
        assert_eq!(server.state(), ListenerState::Stopped);
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let server = Server::new(test_config());
        server.start().await.unwrap();
        assert!(matches!(
            server.start().await,
            Err(ServerError::InvalidState(ListenerState::Running))
        ));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_restart_after_stop_is_rejected() {
        let server = Server::new(test_config());
        server.start().await.unwrap();
        server.stop().await;
        assert!(matches!(
            server.start().await,
            Err(ServerError::InvalidState(ListenerState::Stopped))
        ));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let server = Server::new(test_config());
        server.stop().await;
        assert_eq!(server.state(), ListenerState::Idle);
    }

    #[tokio::test]
    async fn test_bind_failure_leaves_server_idle() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            port: holder.local_addr().unwrap().port(),
            ..test_config()
        };

        let server = Server::new(config);
        assert!(matches!(
            server.start().await,
            Err(ServerError::BindFailure { .. })
        ));
        assert_eq!(server.state(), ListenerState::Idle);
    }

    #[tokio::test]
    async fn test_stop_releases_port() {
        let server = Server::new(test_config());
        server.start().await.unwrap();
        let addr = server.local_addr().await.unwrap();
        server.stop().await;

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}
