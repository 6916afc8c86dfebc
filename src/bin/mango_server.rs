//! Mango Cipher MCP server entry point
//!
//! Run with: cargo run --bin mango-server -- --host 127.0.0.1 --port 3000

use clap::Parser;
use mango_cipher::{HttpServer, ServerConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout stays free for the banner
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::parse();
    let server = HttpServer::bind(&config).await?;

    println!("Mango MCP Server running on {}:{}", config.host, config.port);
    info!(
        "Mango Cipher MCP Server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        server.local_addr()?
    );

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Mango MCP Server shutting down");
    Ok(())
}
