//! RAX chat relay - Entry Point

use log::{error, info};

use rax_chat_server::error::ChatServerError;
use rax_chat_server::error::handlers::handle_error;
use rax_chat_server::utils::setup_logging;
use rax_chat_server::{ServerConfig, ServerControl};

#[tokio::main]
async fn main() {
    setup_logging();

    if let Err(e) = run().await {
        handle_error(&e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ChatServerError> {
    let config = ServerConfig::load()?;
    info!("Launching chat server...");

    let control = ServerControl::new(config);
    control.start_server().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down...");
    control.stop_server().await;
    control.disconnect_clients().await;
    Ok(())
}
