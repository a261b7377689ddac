use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chat::ChatService;

/// Slack added on top of the upstream timeout for the whole request
const REQUEST_TIMEOUT_SLACK_MS: u64 = 5_000;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    chat: Arc<ChatService>,
    started_at: Instant,
    request_timeout: Duration,
}

impl HttpState {
    pub fn new(chat: ChatService, upstream_timeout_ms: u64) -> Self {
        Self {
            chat: Arc::new(chat),
            started_at: Instant::now(),
            request_timeout: Duration::from_millis(
                upstream_timeout_ms.saturating_add(REQUEST_TIMEOUT_SLACK_MS),
            ),
        }
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
