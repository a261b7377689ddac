//! Core telemetry event types describing diagnostics data exposed to the
//! CLI and HTTP surfaces.

use serde::{Deserialize, Serialize};

use crate::performance::PerformanceTier;

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    InvalidRequest,
    MissingApiKey,
    Upstream,
    Unknown,
}

/// Metric events covering classifier decisions and chat proxy outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    TierEvaluated {
        tier: PerformanceTier,
    },
    ChatCompleted {
        latency_ms: u64,
        reply_chars: usize,
    },
    ChatFailed {
        code: DiagnosticError,
        context: String,
    },
}
