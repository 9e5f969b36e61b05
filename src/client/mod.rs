//! Client connection handling
//!
//! Sessions, per-connection pumps and the shared registry that broadcasts to them.

pub mod pump;
pub mod registry;
pub mod session;

pub use pump::{ClientId, ClientPump};
pub use registry::ClientRegistry;
pub use session::ConnectionSession;
