// ChatService: stateless proxy from the chat widget to the upstream model
//
// Validates the request, resolves the API key, assembles the conversation,
// and forwards it once. No retries and no streaming.

use std::sync::Arc;
use std::time::Instant;

use super::gemini::{GeminiClient, GenerativeModel};
use super::prompt::ChatRequest;
use crate::config::ChatConfig;
use crate::error::{log_chat_error, ChatError, ErrorCode};
use crate::telemetry;

/// Where the upstream API key comes from
#[derive(Debug, Clone)]
pub enum ApiKeySource {
    /// Read the named environment variable on every request
    Env(String),
    /// Use a fixed key (None means "not configured")
    Fixed(Option<String>),
}

impl ApiKeySource {
    fn resolve(&self) -> Result<String, ChatError> {
        match self {
            ApiKeySource::Env(name) => std::env::var(name)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .ok_or_else(|| ChatError::MissingApiKey {
                    env_var: name.clone(),
                }),
            ApiKeySource::Fixed(key) => key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| ChatError::MissingApiKey {
                    env_var: "<fixed>".to_string(),
                }),
        }
    }

    /// Whether a key is currently available
    pub fn is_configured(&self) -> bool {
        self.resolve().is_ok()
    }
}

/// Forwards chat requests to a [`GenerativeModel`]
#[derive(Clone)]
pub struct ChatService {
    model: Arc<dyn GenerativeModel>,
    api_key: ApiKeySource,
}

impl ChatService {
    pub fn new(model: Arc<dyn GenerativeModel>, api_key: ApiKeySource) -> Self {
        Self { model, api_key }
    }

    /// Build a service talking to the configured upstream
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            ApiKeySource::Env(config.api_key_env.clone()),
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_configured()
    }

    /// Produce the assistant's reply to `request`
    pub async fn reply(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let result = self.reply_inner(request).await;
        if let Err(err) = &result {
            log_chat_error(err, "ChatService::reply");
            telemetry::hub().record_chat_failure(err.diagnostic(), err.message());
        }
        result
    }

    async fn reply_inner(&self, request: &ChatRequest) -> Result<String, ChatError> {
        if request.message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let api_key = self.api_key.resolve()?;
        let contents = request.conversation();
        let started = Instant::now();

        log::debug!(
            "[Chat] forwarding message with {} history turn(s)",
            request.history.len()
        );

        let reply = self.model.generate(&api_key, &contents).await?;
        if reply.is_empty() {
            return Err(ChatError::EmptyReply);
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let reply_chars = reply.chars().count();
        log::info!(
            "[Chat] reply generated in {} ms ({} chars)",
            latency_ms,
            reply_chars
        );
        telemetry::hub().record_chat_completed(latency_ms, reply_chars);
        Ok(reply)
    }

    /// Numeric code for a result, 0 on success
    pub fn result_code(result: &Result<String, ChatError>) -> i32 {
        result.as_ref().map(|_| 0).unwrap_or_else(|err| err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::prompt::{ChatTurn, Content, ContentRole, PERSONA_ACK, SYSTEM_PROMPT};
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    /// Model that records what it was sent and answers with a canned reply
    struct RecordingModel {
        reply: Result<String, ChatError>,
        seen: Mutex<Vec<(String, Vec<Content>)>>,
    }

    impl RecordingModel {
        fn answering(reply: Result<String, ChatError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl GenerativeModel for RecordingModel {
        fn generate<'a>(
            &'a self,
            api_key: &'a str,
            contents: &'a [Content],
        ) -> BoxFuture<'a, Result<String, ChatError>> {
            self.seen
                .lock()
                .unwrap()
                .push((api_key.to_string(), contents.to_vec()));
            let reply = self.reply.clone();
            Box::pin(async move { reply })
        }
    }

    #[tokio::test]
    async fn reply_forwards_full_conversation() {
        let model = RecordingModel::answering(Ok("A flat white!".to_string()));
        let service = ChatService::new(
            model.clone(),
            ApiKeySource::Fixed(Some("key-123".to_string())),
        );

        let request = ChatRequest {
            message: "Something strong?".to_string(),
            history: vec![ChatTurn {
                role: "assistant".to_string(),
                content: "Welcome!".to_string(),
            }],
        };
        let reply = service.reply(&request).await.expect("reply");
        assert_eq!(reply, "A flat white!");

        let seen = model.seen.lock().unwrap();
        let (key, contents) = &seen[0];
        assert_eq!(key, "key-123");
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0].parts[0].text, SYSTEM_PROMPT);
        assert_eq!(contents[1].parts[0].text, PERSONA_ACK);
        assert_eq!(contents[2].role, ContentRole::Model);
        assert_eq!(contents[3].parts[0].text, "Something strong?");
    }

    #[tokio::test]
    async fn missing_key_never_calls_upstream() {
        let model = RecordingModel::answering(Ok("unused".to_string()));
        let service = ChatService::new(model.clone(), ApiKeySource::Fixed(None));

        let err = service
            .reply(&ChatRequest::new("hi"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, ChatError::MissingApiKey { .. }));
        assert!(model.seen.lock().unwrap().is_empty());
        assert!(!service.is_configured());
    }

    #[tokio::test]
    async fn empty_message_rejected_before_key_lookup() {
        let model = RecordingModel::answering(Ok("unused".to_string()));
        let service = ChatService::new(model, ApiKeySource::Fixed(None));

        let result = service.reply(&ChatRequest::new("")).await;
        assert_eq!(result, Err(ChatError::EmptyMessage));
        assert_eq!(ChatService::result_code(&result), 3001);
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let model = RecordingModel::answering(Err(ChatError::Upstream {
            status: 500,
            body: "boom".to_string(),
        }));
        let service = ChatService::new(model, ApiKeySource::Fixed(Some("k".to_string())));

        let result = service.reply(&ChatRequest::new("hi")).await;
        assert!(matches!(result, Err(ChatError::Upstream { status: 500, .. })));
    }

    #[test]
    fn env_key_source_reports_variable_name() {
        let source = ApiKeySource::Env("CAFE_TEST_UNSET_KEY_VARIABLE".to_string());
        assert_eq!(
            source.resolve(),
            Err(ChatError::MissingApiKey {
                env_var: "CAFE_TEST_UNSET_KEY_VARIABLE".to_string()
            })
        );
    }
}
