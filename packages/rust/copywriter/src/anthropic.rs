//! Anthropic Messages API client (single-turn text completion only).

use leadpipe_shared::{LeadPipeError, LlmConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const SERVICE: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const USER_AGENT: &str = concat!("LeadPipe/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeadPipeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Send one user message and return the concatenated text of the reply.
    /// `max_tokens` overrides the configured limit.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn complete(&self, prompt: &str, max_tokens: Option<u32>) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: max_tokens.unwrap_or(self.max_tokens),
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LeadPipeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LeadPipeError::provider(
                SERVICE,
                format!("HTTP {status}: {}", detail.trim()),
            ));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LeadPipeError::parse(format!("{SERVICE} response: {e}")))?;

        let text: String = reply
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(LeadPipeError::provider(SERVICE, "empty completion"));
        }
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn client_for(server: &wiremock::MockServer) -> AnthropicClient {
        let config = LlmConfig {
            base_url: server.uri(),
            ..LlmConfig::default()
        };
        AnthropicClient::new(&config, "test-key").unwrap()
    }

    pub(crate) async fn mount_reply(server: &wiremock::MockServer, text: &str) {
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/messages"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "text", "text": text }],
                "stop_reason": "end_turn"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn complete_sends_headers_and_reads_text() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/messages"))
            .and(wiremock::matchers::header("x-api-key", "test-key"))
            .and(wiremock::matchers::header("anthropic-version", API_VERSION))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 10
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": "B2B" }]
            })))
            .mount(&server)
            .await;

        let text = client_for(&server).complete("classify", Some(10)).await.unwrap();
        assert_eq!(text, "B2B");
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "rate_limit_error", "message": "Number of requests exceeded" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("hi", None).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("anthropic error"), "{msg}");
        assert!(msg.contains("Number of requests exceeded"), "{msg}");
    }
}
