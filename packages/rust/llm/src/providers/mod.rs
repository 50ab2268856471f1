//! Chat-completion clients for the supported model providers.

mod anthropic;
mod openai;

pub use anthropic::AnthropicChat;
pub use openai::OpenAiChat;

/// Request envelope shared by the provider clients.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}
