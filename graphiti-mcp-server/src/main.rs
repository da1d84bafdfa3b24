use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use graphiti_mcp_server::bootstrap::AppContext;
use graphiti_mcp_server::server::McpServer;
use graphiti_memory::GraphitiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────────
    // stdout carries the protocol stream; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("graphiti_mcp_server=info".parse()?)
                .add_directive("graphiti_memory=info".parse()?),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    info!("graphiti-mcp-server starting");

    // ── Graph backend ─────────────────────────────────────────────────────────
    // A failed connection is not fatal: the server still answers the
    // protocol and reports its status, so clients can surface the problem.
    let config = GraphitiConfig::from_env();
    let ctx = Arc::new(AppContext::initialize(config).await);

    // ── Request loop ──────────────────────────────────────────────────────────
    let server = McpServer::new(ctx.clone());
    let result = tokio::select! {
        r = server.run(tokio::io::stdin(), tokio::io::stdout()) => r,
        _ = shutdown_signal() => Ok(()),
    };

    ctx.shutdown().await;

    if let Err(e) = &result {
        error!(error = %e, "request loop failed");
    }
    info!("server stopped");
    result
}

/// Graceful shutdown on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl-C, shutting down"); }
        _ = terminate => { info!("received SIGTERM, shutting down"); }
    }
}
