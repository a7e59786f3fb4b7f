//! # Topic Gardener — binary entrypoint
//! Boots the registry, the background refactor scheduler, and the Axum
//! HTTP server.
//!
//! ## Endpoints
//! - `POST /classify` — assign a topic to a text fragment
//! - `POST /refactor` — run the six-pass refactor synchronously
//! - `GET /status` — registry snapshot
//! - `GET /operations` — full operation log

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use topic_gardener::config::Config;
use topic_gardener::error::GardenerError;
use topic_gardener::registry::Registry;
use topic_gardener::{api, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("topic_gardener=info")))
        .init();

    let config = Config::parse();
    tracing::info!(
        host = %config.host,
        port = config.port,
        refactor_seconds = config.refactor_seconds,
        "topic-gardener starting"
    );

    let registry = Arc::new(Registry::new(&config));
    let _scheduler = scheduler::spawn_refactor_scheduler(Arc::clone(&registry), config.refactor_seconds);

    let app = api::create_router(registry);
    let (app, _metrics_handle) = topic_gardener::prometheus::attach_metrics_route(app);

    let addr: SocketAddr =
        format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|source| GardenerError::InvalidListenAddr {
                host: config.host.clone(),
                port: config.port,
                source,
            })?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
