//! Client registry
//!
//! Tracks the active pumps and fans messages out to them. Every operation
//! runs under the same lock, so a broadcast never overlaps a membership change.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::pump::{ClientId, ClientPump};
use crate::protocol::{compose_roster, fits_frame};

/// Registry of active client pumps, in registration order
pub struct ClientRegistry {
    clients: Mutex<Vec<Arc<ClientPump>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Adds a pump. Registering the same pump twice keeps one entry.
    pub async fn register(&self, pump: Arc<ClientPump>) {
        let mut clients = self.clients.lock().await;
        if clients.iter().any(|c| c.id() == pump.id()) {
            warn!("Client {} is already registered", pump.label());
            return;
        }
        clients.push(pump);
        debug!("Registered client ({} active)", clients.len());
    }

    /// Removes the pump with `id`; a no-op if it is not registered.
    pub async fn deregister(&self, id: ClientId) {
        let mut clients = self.clients.lock().await;
        if let Some(index) = clients.iter().position(|c| c.id() == id) {
            let pump = clients.remove(index);
            info!(
                "Client removed: {} ({} active)",
                pump.label(),
                clients.len()
            );
        }
    }

    /// Enqueues `text` on every registered pump, the sender included.
    ///
    /// A recipient that cannot be reached is logged and skipped. Text too
    /// long for one frame is dropped before any pump sees it; returns
    /// whether the message went out.
    pub async fn broadcast_to_all(&self, text: &str) -> bool {
        if !fits_frame(text) {
            warn!("Dropping broadcast of {} bytes: exceeds frame limit", text.len());
            return false;
        }

        let clients = self.clients.lock().await;
        debug!("Broadcasting to {} clients: {}", clients.len(), text);
        fan_out(&clients, text);
        true
    }

    /// Composes the roster and broadcasts it, all under one lock.
    ///
    /// No-op when nobody is registered, nobody is named yet, or the roster
    /// would not fit in a frame. Returns whether a roster went out.
    pub async fn broadcast_roster(&self) -> bool {
        let clients = self.clients.lock().await;
        if clients.is_empty() {
            return false;
        }

        let names: Vec<&str> = clients.iter().filter_map(|c| c.name()).collect();
        let Some(roster) = compose_roster(&names) else {
            return false;
        };
        if !fits_frame(&roster) {
            warn!(
                "Skipping roster of {} clients: {} bytes exceeds frame limit",
                names.len(),
                roster.len()
            );
            return false;
        }

        debug!("Announcing roster of {} clients", names.len());
        fan_out(&clients, &roster);
        true
    }

    /// Names of named clients in registration order, taken under one lock.
    ///
    /// Clients that have not sent their name yet are left out.
    pub async fn snapshot_names(&self) -> Vec<String> {
        let clients = self.clients.lock().await;
        clients
            .iter()
            .filter_map(|c| c.name().map(str::to_owned))
            .collect()
    }

    /// Closes every registered session so each pump tears itself down.
    ///
    /// Sessions are closed outside the lock; the pumps take it again to
    /// deregister.
    pub async fn disconnect_all(&self) {
        let clients: Vec<Arc<ClientPump>> = self.clients.lock().await.clone();
        if !clients.is_empty() {
            info!("Disconnecting {} clients", clients.len());
        }
        for client in clients {
            client.disconnect().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

fn fan_out(clients: &[Arc<ClientPump>], text: &str) {
    for client in clients {
        if let Err(e) = client.enqueue(text) {
            warn!("{}", e);
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
