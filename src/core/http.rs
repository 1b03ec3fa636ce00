//! HTTP endpoint server assembled from grouped decorator chains

use axum::{
    extract::{Path, State},
    http::{header::CACHE_CONTROL, HeaderName, HeaderValue, StatusCode},
    response::Json,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::metrics::Metrics;
use crate::middleware::{
    log_request, recover_panic, set_response_header, track_metrics, Decorator, Handler, Mux,
};

pub const SERVICE_NAME: &str = "heartmux";

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            start_time: Arc::new(Instant::now()),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": SERVICE_NAME
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn echo(Path(message): Path<String>) -> Json<Value> {
    Json(json!({ "message": message }))
}

async fn server_time() -> Json<Value> {
    Json(json!({ "now": chrono::Utc::now().to_rfc3339() }))
}

/// Build the routing tree.
///
/// Global decorators wrap every request, ungrouped routes and 404s included.
/// `/health` and `/metrics` carry no route decorators of their own.
pub fn create_mux(state: AppState) -> Mux {
    let mut mux = Mux::new();

    mux.use_global([
        recover_panic(),
        Decorator::from_layer(
            "trace",
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
        log_request(),
        track_metrics(state.metrics.clone()),
    ]);

    mux.handle(
        "GET /health",
        Handler::from_stateful_handler(health_check, state.clone()),
    );
    mux.handle(
        "GET /metrics",
        Handler::from_stateful_handler(metrics_handler, state),
    );

    mux.group(|api| {
        api.use_route([
            Decorator::from_layer("cors", CorsLayer::permissive()),
            set_response_header(CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ]);
        api.handle("GET /api/echo/{message}", Handler::from_handler(echo));

        api.group(|v1| {
            v1.use_route([set_response_header(
                HeaderName::from_static("x-api-version"),
                HeaderValue::from_static("1"),
            )]);
            v1.handle("GET /api/v1/time", Handler::from_handler(server_time));
        });
    });

    mux
}

pub fn create_router(state: AppState) -> Router {
    create_mux(state).into_router()
}

pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = Arc::new(Metrics::new()?);
    let app = create_router(AppState::new(metrics));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
