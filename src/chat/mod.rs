//! Barista chat proxy.
//!
//! Accepts a user message plus prior turns from the site's chat widget,
//! prepends the fixed persona preamble, and forwards the conversation to an
//! external generative-language service.

pub mod gemini;
pub mod prompt;
pub mod service;

pub use gemini::{GeminiClient, GenerativeModel};
pub use prompt::{ChatRequest, ChatTurn, Content, ContentRole, Part, PERSONA_ACK, SYSTEM_PROMPT};
pub use service::{ApiKeySource, ChatService};
