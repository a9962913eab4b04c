//! Route Server - terrain-aware routing and road graph backend

use anyhow::Result;
use route_server::{api, config::Config, dataset::GeoJsonMap, persistence, state::AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("route_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Route Server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;

    let map = match GeoJsonMap::from_path(&config.dataset_path, config.map_zoom) {
        Ok(map) => map,
        Err(err) => {
            tracing::warn!("Dataset unavailable, terrain falls back to region heuristics: {:#}", err);
            GeoJsonMap::unavailable(config.map_zoom)
        }
    };

    let state = Arc::new(AppState::new(config, map, db));

    // Road graph comes from the cache when fresh, otherwise from the dataset
    tokio::spawn({
        let state = state.clone();
        async move { state.init_roads().await }
    });

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
