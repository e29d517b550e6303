mod error;
mod middleware;
mod routes;
mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use mci_core::AppConfig;
use tower_http::trace::TraceLayer;

use state::AppState;

#[tokio::main]
async fn main() {
    let config = AppConfig::load().unwrap_or_else(|err| {
        eprintln!("configuration error: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.environment.log_level.clone()))
        .json()
        .init();

    let cors_origins = config.cors_origins_list();
    let shared_state = AppState::build(config);

    let app = Router::new()
        .route("/api/chat", post(routes::chat))
        .route("/health", get(routes::health))
        .route("/ready", get(routes::ready))
        .layer(middleware::build_cors_layer(cors_origins))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!(%addr, "starting mci-server");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server terminated unexpectedly");
}
