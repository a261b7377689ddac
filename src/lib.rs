// Love Over Coffee - adaptive rendering core and chat proxy
// Performance-tier classification for the site's visual components plus the
// stateless HTTP passthrough behind the barista chat widget

// Module declarations
pub mod chat;
pub mod config;
pub mod error;
pub mod http;
pub mod performance;
pub mod telemetry;

// Re-exports for convenience
pub use performance::{
    evaluate, ClassifierOutput, ClassifierSignals, PerformanceMonitor, PerformanceTier,
    SignalProbe, Subscription,
};

/// Install the fmt subscriber for tracing and `log` records
///
/// `level` is parsed as a tracing level (error, warn, info, debug, trace);
/// anything else falls back to info. Safe to call more than once.
pub fn init_logging(level: &str) {
    let level = level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    if tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
    {
        log::debug!("[Logging] initialized at {}", level);
    }
}
