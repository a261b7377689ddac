// Chat proxy error types and constants

use crate::error::ErrorCode;
use crate::telemetry::DiagnosticError;
use log::error;
use std::fmt;

/// Chat error code constants
///
/// Error code range: 3001-3005
pub struct ChatErrorCodes {}

impl ChatErrorCodes {
    /// Request carried no usable message
    pub const EMPTY_MESSAGE: i32 = 3001;

    /// Upstream API key is not configured
    pub const MISSING_API_KEY: i32 = 3002;

    /// Upstream answered with a non-success status
    pub const UPSTREAM: i32 = 3003;

    /// Upstream could not be reached or its body could not be read
    pub const TRANSPORT: i32 = 3004;

    /// Upstream answered without any reply text
    pub const EMPTY_REPLY: i32 = 3005;
}

/// Log a chat error with structured context
///
/// Fields: error code, component, message, and the caller-supplied context.
pub fn log_chat_error(err: &ChatError, context: &str) {
    error!(
        "Chat error in {}: code={}, component=ChatProxy, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Chat proxy errors
///
/// Error code range: 3001-3005
#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Message missing, not a string, or empty
    EmptyMessage,

    /// The environment variable holding the API key is unset or empty
    MissingApiKey { env_var: String },

    /// Upstream returned a non-2xx status
    Upstream { status: u16, body: String },

    /// Network failure, timeout, or undecodable upstream body
    Transport { reason: String },

    /// Upstream succeeded but produced no text
    EmptyReply,
}

impl ChatError {
    /// Telemetry classification for this error
    pub fn diagnostic(&self) -> DiagnosticError {
        match self {
            ChatError::EmptyMessage => DiagnosticError::InvalidRequest,
            ChatError::MissingApiKey { .. } => DiagnosticError::MissingApiKey,
            ChatError::Upstream { .. } | ChatError::Transport { .. } | ChatError::EmptyReply => {
                DiagnosticError::Upstream
            }
        }
    }
}

impl ErrorCode for ChatError {
    fn code(&self) -> i32 {
        match self {
            ChatError::EmptyMessage => ChatErrorCodes::EMPTY_MESSAGE,
            ChatError::MissingApiKey { .. } => ChatErrorCodes::MISSING_API_KEY,
            ChatError::Upstream { .. } => ChatErrorCodes::UPSTREAM,
            ChatError::Transport { .. } => ChatErrorCodes::TRANSPORT,
            ChatError::EmptyReply => ChatErrorCodes::EMPTY_REPLY,
        }
    }

    fn message(&self) -> String {
        match self {
            ChatError::EmptyMessage => "Message is required".to_string(),
            ChatError::MissingApiKey { env_var } => {
                format!("API key not configured (set {})", env_var)
            }
            ChatError::Upstream { status, body } => {
                format!("Upstream returned HTTP {}: {}", status, body)
            }
            ChatError::Transport { reason } => format!("Upstream request failed: {}", reason),
            ChatError::EmptyReply => "Upstream returned no reply text".to_string(),
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChatError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport {
            reason: err.to_string(),
        }
    }
}
