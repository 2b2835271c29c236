//! Router assembly and server-level middleware.

use crate::handlers;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use deskflow_graph::Graph;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Allowed CORS origins; empty allows all (development).
    pub allowed_origins: Vec<String>,
    pub max_body_size: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_body_size: 1024 * 1024,
            request_timeout: Duration::from_secs(120),
        }
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if config.allowed_origins.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<_> =
            config.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

/// The four turn routes for one agent.
fn agent_routes(agent: Arc<Graph>) -> Router {
    Router::new()
        .route("/generate-answer", post(handlers::generate_answer))
        .route("/continue-answer", post(handlers::continue_answer))
        .route("/stream/generate-answer", post(handlers::stream_generate_answer))
        .route("/stream/continue-answer", post(handlers::stream_continue_answer))
        .with_state(agent)
}

/// Build the application: supervisor under `/multi-agent`, the generalist
/// agent under `/single-agent`.
pub fn create_app(supervisor: Arc<Graph>, single_agent: Arc<Graph>, config: ServerConfig) -> Router {
    Router::new()
        .nest("/multi-agent", agent_routes(supervisor))
        .nest("/single-agent", agent_routes(single_agent))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout))
                .layer(DefaultBodyLimit::max(config.max_body_size))
                .layer(cors_layer(&config)),
        )
}
