//! Avroute server: avalanche-aware route planning over HTTP.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avroute_server::api;
use avroute_server::config::Config;
use avroute_server::persistence;
use avroute_server::state::{AppState, TerrainLayers};

#[tokio::main]
async fn main() -> Result<()> {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("avroute_server=debug".parse()?)
            .add_directive("avroute_core=info".parse()?),
    );
    // AVROUTE_LOG_FORMAT=json for log shippers
    if std::env::var("AVROUTE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting avroute server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections).await?;
    let terrain = TerrainLayers::load(&config)?;
    if terrain.is_none() {
        tracing::warn!("No terrain grids configured; path requests will be refused");
    }
    let state = Arc::new(AppState::new(config, db, terrain));

    let app = api::routes().with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
