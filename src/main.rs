use axum::{
  extract::{ConnectInfo, State, WebSocketUpgrade},
  http::Method,
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod app;
mod game;
mod protocol;
mod render;
mod room;
mod shared;
mod transport;

use app::config::AppConfig;
use room::registry::Registry;
use room::RoomStats;
use transport::ws_session::handle_socket;

#[derive(Clone)]
struct AppState {
  registry: Arc<Registry>,
}

#[derive(Debug, Serialize)]
struct OkResponse {
  ok: bool,
}

#[derive(Debug, Serialize)]
struct RoomsResponse {
  rooms: Vec<RoomStats>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = AppConfig::from_env()?;
  let registry = Registry::new(config.room);
  let state = Arc::new(AppState {
    registry: Arc::clone(&registry),
  });

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET])
    .allow_headers(Any);

  let app: Router = Router::new()
    .route("/api/health", get(health))
    .route("/api/rooms", get(rooms))
    .route("/api/play", get(ws_handler))
    .layer(cors)
    .with_state(state);

  let address = config.address();
  tracing::info!(
    idle_timeout_secs = config.room.idle_timeout.as_secs(),
    "listening on {address}"
  );
  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(
    listener,
    app.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .with_graceful_shutdown(shutdown_signal(registry))
  .await?;

  tracing::info!("server stopped");
  Ok(())
}

/// Resolves on ctrl-c once every room has said goodbye, so players get their
/// farewell before connections drain.
async fn shutdown_signal(registry: Arc<Registry>) {
  if let Err(error) = tokio::signal::ctrl_c().await {
    tracing::warn!(?error, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
  registry.shutdown().await;
}

async fn health() -> impl IntoResponse {
  Json(OkResponse { ok: true })
}

async fn rooms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(RoomsResponse {
    rooms: state.registry.overview(),
  })
}

async fn ws_handler(
  ws: WebSocketUpgrade,
  ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
  State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
  let registry = Arc::clone(&state.registry);
  ws.on_upgrade(move |socket| handle_socket(socket, registry, remote_addr))
}
