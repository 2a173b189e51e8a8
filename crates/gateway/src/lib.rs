//! HTTP API gateway for Engram.
//!
//! Exposes the engine over REST: a chat endpoint that streams the reply as
//! SSE, a state inspection endpoint, and session management.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use engram_config::GatewayConfig;
use engram_engine::Controller;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub controller: Arc<Controller>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(controller: Arc<Controller>) -> SharedState {
        Arc::new(Self {
            controller,
            start_time: chrono::Utc::now(),
        })
    }
}

/// Build the full router: health at the root, the v1 API nested under /v1.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &GatewayConfig, state: SharedState) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Gateway listening");
    axum::serve(listener, build_router(state)).await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: i64,
    sessions: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        sessions: state.controller.session_count().await,
    })
}
