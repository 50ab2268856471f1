//! Anthropic messages-API client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use brandlens_shared::{BrandLensError, Result};

use super::ChatRequest;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Minimal async client for the Anthropic messages endpoint.
pub struct AnthropicChat {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnthropicChat {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                BrandLensError::Network(format!("failed to build Anthropic HTTP client: {e}"))
            })?;
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the client at a mock server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run one message completion and return the joined text blocks.
    pub async fn complete(&self, model: &str, request: &ChatRequest<'_>) -> Result<String> {
        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user",
                content: request.prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.trim())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandLensError::Provider(format!("Anthropic call failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(BrandLensError::Provider(format!(
                "Anthropic returned {status}: {text}"
            )));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| BrandLensError::Provider(format!("invalid Anthropic response: {e}")))?;

        let answer = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if answer.is_empty() {
            return Err(BrandLensError::Provider(
                "Anthropic response missing text content".into(),
            ));
        }

        Ok(answer.trim().to_string())
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_joins_text_blocks_and_skips_others() {
        let json = r#"{"content":[
            {"type":"text","text":"part one"},
            {"type":"tool_use","id":"x","name":"t","input":{}},
            {"type":"text","text":"part two"}
        ]}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        let texts: Vec<String> = parsed
            .content
            .into_iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        assert_eq!(texts, vec!["part one", "part two"]);
    }

    #[tokio::test]
    async fn complete_returns_text() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/messages"))
            .and(wiremock::matchers::header("anthropic-version", API_VERSION))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "content": [{"type": "text", "text": "claude says hi"}]
                }),
            ))
            .mount(&server)
            .await;

        let client = AnthropicChat::new("test-key".into())
            .unwrap()
            .with_base_url(server.uri());

        let answer = client
            .complete(
                "claude-haiku-4-5-20251001",
                &ChatRequest {
                    prompt: "q",
                    temperature: 0.2,
                    max_tokens: 100,
                },
            )
            .await
            .unwrap();

        assert_eq!(answer, "claude says hi");
    }
}
