use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::telemetry;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(5);

pub type MetricStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Build a Server-Sent Events stream of live telemetry events.
///
/// Lagged receivers skip the events they missed rather than closing.
pub fn metric_events() -> MetricStream {
    let receiver = telemetry::hub().collector().subscribe();

    let stream = BroadcastStream::new(receiver).filter_map(|item| async move {
        let event = item.ok()?;
        let payload = serde_json::to_string(&event).ok()?;
        Some(Ok::<_, Infallible>(Event::default().event("metric").data(payload)))
    });

    let keep_alive = KeepAlive::new()
        .interval(KEEP_ALIVE_INTERVAL)
        .text("cafe-keepalive");
    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(keep_alive)
}
