//! WeCom Admin - MCP server for the WeCom corp directory
//!
//! This binary runs as an MCP server using stdio transport, allowing an
//! MCP client to browse and manage a WeCom directory and send app messages.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `WECOM_CORP_ID`: The corp id
//! - `WECOM_CORP_SECRET`: The app secret
//! - `WECOM_AGENT_ID`: App id for messages (optional, default `1`)
//!
//! # Usage
//!
//! ```bash
//! WECOM_CORP_ID=ww0123 WECOM_CORP_SECRET=xxx ./wecom-admin
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use wecom_admin::{config, server, wecom_client};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // stdout carries MCP JSON-RPC, so logs go to stderr
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wecom_admin=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting WeCom admin MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(
        base_url = %config.base_url,
        agent_id = config.agent_id,
        "Configuration loaded"
    );

    // Acquires the access token; bad credentials fail here.
    let client = wecom_client::WeComClient::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e.sanitized_display(&[config.corp_secret()])))
        .context("Failed to obtain a WeCom access token")?;

    tracing::info!("Testing WeCom directory access...");
    if let Err(e) = client.test_connection().await {
        tracing::error!(error = %e, "Connection test failed");
        tracing::warn!(
            "Server will start but directory calls may fail. \
             Check the app's contact permissions and trusted IPs."
        );
    }

    let server = server::WeComServer::new(client);

    tracing::info!("Server initialized, starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    tracing::info!("Server running, waiting for requests");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}
