// Error types for the café service
//
// The performance classifier is total and has no error type. Everything that
// can fail lives in the chat proxy, which reports structured errors with
// numeric codes so HTTP and CLI callers can handle them uniformly.

mod chat;

pub use chat::{log_chat_error, ChatError, ChatErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
