use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{BoxError, Router};
use serde::Serialize;
use serde_json::Value;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;

use crate::chat::ChatRequest;
use crate::error::ChatError;
use crate::performance::{evaluate, ClassifierOutput, ClassifierSignals, MotionProfile, SignalProbe};
use crate::telemetry::{self, TelemetrySnapshot};

use super::sse;
use super::state::HttpState;

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    BadRequest(&'static str),
    Internal(&'static str),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<ChatError> for HttpServerError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => Self::BadRequest("Message is required"),
            ChatError::MissingApiKey { .. } => Self::Internal("API key not configured"),
            ChatError::Upstream { .. } | ChatError::Transport { .. } | ChatError::EmptyReply => {
                Self::Internal("Failed to generate response")
            }
        }
    }
}

/// Chat endpoint response payload.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Classification endpoint response payload.
#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    #[serde(flatten)]
    pub output: ClassifierOutput,
    pub motion_profile: MotionProfile,
    pub signals: ClassifierSignals,
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_ms: u64,
    pub chat_configured: bool,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: HttpState) -> Router {
    let timeout = state.request_timeout();

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/performance", post(performance))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/metrics/stream", get(metrics_stream))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(state)
}

/// Run the HTTP server loop until `shutdown` resolves.
pub async fn run_http_server<F>(state: HttpState, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {addr}"))?;
    log::info!("[HTTP] listening on {}", addr);

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("serving HTTP router")?;

    log::info!("[HTTP] server stopped");
    Ok(())
}

async fn handle_layer_error(err: BoxError) -> HttpServerError {
    if err.is::<Elapsed>() {
        log::warn!("[HTTP] request timed out");
        HttpServerError::Internal("Failed to generate response")
    } else {
        log::error!("[HTTP] unhandled middleware error: {}", err);
        HttpServerError::Internal("Internal server error")
    }
}

pub async fn chat(
    State(state): State<HttpState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, HttpServerError> {
    let Json(body) = body.map_err(|rejection| {
        log::warn!("[HTTP] rejected chat body: {}", rejection);
        HttpServerError::BadRequest("Message is required")
    })?;

    let request = ChatRequest::from_json(&body)?;
    let response = state.chat().reply(&request).await?;

    Ok(Json(ChatResponse { response }))
}

pub async fn performance(
    body: Result<Json<SignalProbe>, JsonRejection>,
) -> Result<Json<PerformanceResponse>, HttpServerError> {
    let Json(probe) = body.map_err(|rejection| {
        log::warn!("[HTTP] rejected signal probe: {}", rejection);
        HttpServerError::BadRequest("Invalid signal probe")
    })?;

    let signals = probe.resolve();
    let output = evaluate(&signals);
    telemetry::hub().record_tier(output.tier);

    Ok(Json(PerformanceResponse {
        motion_profile: output.motion_profile(),
        output,
        signals,
    }))
}

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_ms: state.uptime_ms(),
        chat_configured: state.chat().is_configured(),
    })
}

pub async fn metrics() -> Json<TelemetrySnapshot> {
    Json(telemetry::hub().snapshot())
}

pub async fn metrics_stream() -> sse::MetricStream {
    sse::metric_events()
}
