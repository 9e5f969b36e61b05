//! Network utilities
//!
//! Turns a configured address and backlog into a listening endpoint.

use log::{error, info};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpSocket, lookup_host};

use crate::error::ServerError;

/// Bind a listener on `addr` with room for `backlog` pending connections.
pub async fn bind_listener(addr: &str, backlog: u32) -> Result<TcpListener, ServerError> {
    let bind_failure = |source: std::io::Error| {
        error!("Failed to bind to {}: {}", addr, source);
        ServerError::BindFailure {
            addr: addr.to_string(),
            source,
        }
    };

    let socket_addr = resolve(addr).await.map_err(bind_failure)?;

    let socket = match socket_addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(bind_failure)?;

    socket.set_reuseaddr(true).map_err(bind_failure)?;
    socket.bind(socket_addr).map_err(bind_failure)?;
    let listener = socket.listen(backlog).map_err(bind_failure)?;

    info!("Server bound to {} (backlog {})", socket_addr, backlog);
    Ok(listener)
}

async fn resolve(addr: &str) -> std::io::Result<SocketAddr> {
    lookup_host(addr).await?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("{} did not resolve to any address", addr),
        )
    })
}
