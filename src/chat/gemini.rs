//! Client for the Google Generative Language REST API.
//!
//! Only the non-streaming `generateContent` call is used:
//!
//! ```text
//! POST {api_base}/v1beta/models/{model}:generateContent?key={api_key}
//! {"contents": [{"role": "user", "parts": [{"text": "..."}]}, ...]}
//! ```
//!
//! The reply text is the concatenation of the first candidate's parts.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt::Content;
use crate::config::ChatConfig;
use crate::error::ChatError;

/// Upstream text generator
pub trait GenerativeModel: Send + Sync {
    /// Generate a reply for the given conversation
    fn generate<'a>(
        &'a self,
        api_key: &'a str,
        contents: &'a [Content],
    ) -> BoxFuture<'a, Result<String, ChatError>>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// `generateContent` client backed by reqwest
pub struct GeminiClient {
    client: Client,
    api_base: String,
    model: String,
}

impl GeminiClient {
    /// Create a client from chat configuration
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    async fn generate_content(
        &self,
        api_key: &str,
        contents: &[Content],
    ) -> Result<String, ChatError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&GenerateContentRequest { contents })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.into_text().ok_or(ChatError::EmptyReply)
    }
}

impl GenerativeModel for GeminiClient {
    fn generate<'a>(
        &'a self,
        api_key: &'a str,
        contents: &'a [Content],
    ) -> BoxFuture<'a, Result<String, ChatError>> {
        Box::pin(self.generate_content(api_key, contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::prompt::ContentRole;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = ChatConfig {
            api_base: format!("{}/", server.uri()),
            model: "gemini-pro".to_string(),
            timeout_ms: 2_000,
            ..Default::default()
        };
        GeminiClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn concatenates_first_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(query_param("key", "secret"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": "Try "}, {"text": "a latte!"}]}},
                    {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let contents = vec![Content::text(ContentRole::User, "hello")];
        let reply = client_for(&server)
            .generate("secret", &contents)
            .await
            .expect("reply");
        assert_eq!(reply, "Try a latte!");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
            .mount(&server)
            .await;

        let contents = vec![Content::text(ContentRole::User, "hello")];
        let err = client_for(&server)
            .generate("bad", &contents)
            .await
            .expect_err("should fail");
        assert_eq!(
            err,
            ChatError::Upstream {
                status: 403,
                body: "API key invalid".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_candidates_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let contents = vec![Content::text(ContentRole::User, "hello")];
        let err = client_for(&server)
            .generate("secret", &contents)
            .await
            .expect_err("should fail");
        assert_eq!(err, ChatError::EmptyReply);
    }

    #[tokio::test]
    async fn undecodable_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let contents = vec![Content::text(ContentRole::User, "hello")];
        let err = client_for(&server)
            .generate("secret", &contents)
            .await
            .expect_err("should fail");
        assert!(matches!(err, ChatError::Transport { .. }));
    }
}
