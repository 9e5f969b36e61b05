//! RAX chat relay
//!
//! Accepts TCP clients, relays every line a client sends to all connected
//! clients, and periodically broadcasts the roster of connected names.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod utils;

pub use config::ServerConfig;
pub use server::{Server, ServerControl};
