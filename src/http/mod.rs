//! HTTP surface for the café site.
//!
//! A lightweight Axum server exposing the chat proxy, a classification
//! endpoint for browser-reported signals, health, and telemetry metrics
//! (snapshot and live SSE stream).

mod routes;
mod sse;
mod state;


pub use routes::{
    build_router, run_http_server, ChatResponse, HealthResponse, HttpServerError,
    PerformanceResponse,
};
pub use state::HttpState;
