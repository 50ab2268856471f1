//! Language-model collaborators for BrandLens.
//!
//! Everything that talks to a model provider lives here: chat clients for
//! OpenAI and Anthropic, the web-search grounding used when firing queries,
//! the prompt builders, and [`LlmSuite`] — the live implementation of the
//! pipeline core's model-side contract.

pub mod prompts;
pub mod providers;
pub mod search;
pub mod suite;

pub use providers::{AnthropicChat, ChatRequest, OpenAiChat};
pub use search::{SearchClient, SearchHit};
pub use suite::{AnswerModel, LlmSuite, Provider, parse_string_array, strip_code_fences};
