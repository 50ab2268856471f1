//! OpenAI chat-completions client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use brandlens_shared::{BrandLensError, Result};

use super::ChatRequest;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Minimal async client for the OpenAI chat completions endpoint.
pub struct OpenAiChat {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiChat {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                BrandLensError::Network(format!("failed to build OpenAI HTTP client: {e}"))
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

    /// Run one chat completion and return the assistant text.
    pub async fn complete(&self, model: &str, request: &ChatRequest<'_>) -> Result<String> {
        let body = ChatCompletionRequest {
            model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandLensError::Provider(format!("OpenAI call failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(BrandLensError::Provider(format!(
                "OpenAI returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| BrandLensError::Provider(format!("invalid OpenAI response: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(answer.trim().to_string())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
