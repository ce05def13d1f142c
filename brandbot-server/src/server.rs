//! brandbot-server/src/server.rs
//!
//! Runs the HTTP API until Ctrl-C, then drains the training pipeline.

use std::net::SocketAddr;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::api;
use crate::context::ServerContext;
use crate::Args;

pub async fn run_server(args: Args) -> anyhow::Result<()> {
    let addr: SocketAddr = args
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", args.bind_addr))?;

    let ctx = ServerContext::new(&args).await?;
    let app = api::router(ctx.state.clone());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP API listening on http://{}/rest/v1", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP API stopped; waiting for training workers.");
    ctx.pipeline.shutdown_and_wait().await;
    if let Some(db) = ctx.db {
        db.pool().close().await;
    }
    info!("Server shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received => shutting down.");
}
