//! App Store Connect report MCP server entry point.
//!
//! Loads configuration from the environment (and `.env`), builds the App
//! Store Connect client and the PostgreSQL handle, then serves MCP tools
//! over stdio.

mod appstore;
mod config;
mod database;
mod error;
mod files;
mod hashing;
mod params;
mod response;
mod server;
mod splitter;
mod table;

use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

use crate::appstore::AppStoreClient;
use crate::config::Config;
use crate::database::Database;
use crate::server::AppStoreReportServer;

/// Runs the MCP server.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the HTTP client or
/// DSN cannot be set up, or the stdio transport encounters an error.
async fn run() -> Result<(), Box<dyn core::error::Error>> {
    // stdout carries the MCP stdio transport.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("starting App Store Connect report MCP server");

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let client = AppStoreClient::new(config.api.clone())?;
    let database = Database::new(config.database_url.as_deref())?;

    let mcp_server = AppStoreReportServer::new(client, database, config);
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let service = mcp_server.serve(transport).await?;

    tracing::info!("MCP server running on stdio");
    let _quit_reason = service.waiting().await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(%err, "fatal error");
        std::process::exit(1);
    }
}
