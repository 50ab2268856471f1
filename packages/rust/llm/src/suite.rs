//! The live language-model collaborator suite.
//!
//! Bundles the chat providers, the search client, and the prompt builders
//! behind the operations the pipeline core needs: industry detection,
//! competitor discovery, query generation, answer firing, and structured
//! field extraction.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use brandlens_shared::{
    AppConfig, BrandLensError, ERROR_SENTINEL, OrderedMap, QueryCategory, Result,
};

use crate::prompts;
use crate::providers::{AnthropicChat, ChatRequest, OpenAiChat};
use crate::search::SearchClient;

/// Which provider serves a wire model key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

/// One entry in the fixed answer-model fan-out set.
#[derive(Debug, Clone)]
pub struct AnswerModel {
    /// Wire key recorded in `raw_answer` maps (e.g. `openai:gpt-4o`).
    pub key: String,
    pub provider: Provider,
    pub model: String,
}

/// Live implementation of the pipeline's language-model collaborators.
pub struct LlmSuite {
    openai: OpenAiChat,
    anthropic: AnthropicChat,
    search: SearchClient,
    answer_models: Vec<AnswerModel>,
    generation_model: String,
    parser_model: String,
}

impl LlmSuite {
    /// Build a suite from explicit API keys and app config.
    pub fn new(
        openai_api_key: String,
        anthropic_api_key: String,
        config: &AppConfig,
    ) -> Result<Self> {
        let answer_models = vec![
            AnswerModel {
                key: format!("openai:{}", config.openai.answer_model),
                provider: Provider::OpenAi,
                model: config.openai.answer_model.clone(),
            },
            AnswerModel {
                key: format!("claude:{}", config.anthropic.answer_model),
                provider: Provider::Anthropic,
                model: config.anthropic.answer_model.clone(),
            },
        ];

        Ok(Self {
            openai: OpenAiChat::new(openai_api_key)?,
            anthropic: AnthropicChat::new(anthropic_api_key)?,
            search: SearchClient::new()?,
            answer_models,
            generation_model: config.openai.generation_model.clone(),
            parser_model: config.openai.parser_model.clone(),
        })
    }

    /// Build a suite reading API keys from the env vars named in config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let openai_key = read_api_key(&config.openai.api_key_env)?;
        let anthropic_key = read_api_key(&config.anthropic.api_key_env)?;
        Self::new(openai_key, anthropic_key, config)
    }

    /// The fixed model set fired per query.
    pub fn answer_models(&self) -> &[AnswerModel] {
        &self.answer_models
    }

    /// Classify the brand's commercial industry from site text.
    #[instrument(skip_all)]
    pub async fn detect_industry(&self, site_text: &str) -> Result<String> {
        let prompt = prompts::industry_prompt(site_text);
        let raw = self
            .openai
            .complete(
                &self.generation_model,
                &ChatRequest {
                    prompt: &prompt,
                    temperature: 0.0,
                    max_tokens: 64,
                },
            )
            .await?;

        Ok(clean_industry_phrase(&raw))
    }

    /// Discover direct competitor brand names from site text.
    ///
    /// A malformed model response degrades to an empty list; only transport
    /// and API failures surface as errors.
    #[instrument(skip_all, fields(brand = %brand))]
    pub async fn discover_competitors(
        &self,
        brand: &str,
        industry: &str,
        site_text: &str,
    ) -> Result<Vec<String>> {
        let prompt = prompts::competitor_prompt(brand, industry, site_text);
        let raw = self
            .openai
            .complete(
                &self.generation_model,
                &ChatRequest {
                    prompt: &prompt,
                    temperature: 0.0,
                    max_tokens: 400,
                },
            )
            .await?;

        let names = match parse_string_array(&raw) {
            Ok(names) => names,
            Err(e) => {
                debug!(error = %e, "competitor list unparseable, treating as empty");
                Vec::new()
            }
        };

        Ok(sanitize_competitor_names(names, brand))
    }

    /// Generate `count` buyer-intent queries for one category.
    ///
    /// Any failure is a [`BrandLensError::QueryGeneration`] scoped to the
    /// category — fatal for that category's quota only.
    #[instrument(skip_all, fields(category = %category, count))]
    pub async fn generate_queries(
        &self,
        category: QueryCategory,
        brand: &str,
        industry: &str,
        competitors: &[String],
        region: &str,
        count: usize,
    ) -> Result<Vec<String>> {
        let prompt =
            prompts::query_generation_prompt(category, brand, industry, competitors, region, count);

        let raw = self
            .openai
            .complete(
                &self.generation_model,
                &ChatRequest {
                    prompt: &prompt,
                    temperature: 0.7,
                    max_tokens: 800,
                },
            )
            .await
            .map_err(|e| BrandLensError::generation(category.as_str(), e.to_string()))?;

        parse_string_array(&raw)
            .map_err(|e| BrandLensError::generation(category.as_str(), e.to_string()))
    }

    /// Fire one query at the full answer-model set.
    ///
    /// Total: a provider failure becomes an `"ERROR: …"` answer for that
    /// model's slot, so every fired (query, model) pair yields a row.
    #[instrument(skip_all)]
    pub async fn answer_query(&self, query: &str) -> OrderedMap<String> {
        let web_results = self.search.web_results_block(query).await;
        let prompt = prompts::answer_prompt(query, &web_results);

        let request = ChatRequest {
            prompt: &prompt,
            temperature: 0.2,
            max_tokens: 800,
        };

        let mut answers = OrderedMap::new();
        for model in &self.answer_models {
            let result = match model.provider {
                Provider::OpenAi => self.openai.complete(&model.model, &request).await,
                Provider::Anthropic => self.anthropic.complete(&model.model, &request).await,
            };

            let answer = match result {
                Ok(text) => text,
                Err(e) => {
                    debug!(model = %model.key, error = %e, "answer call failed");
                    format!("{ERROR_SENTINEL}: {e}")
                }
            };
            answers.insert(model.key.clone(), answer);
        }

        answers
    }

    /// Run the strict extraction prompt over one raw answer.
    ///
    /// Returns the model's raw output; shape validation is owned by the
    /// pipeline core.
    pub async fn extract_fields(
        &self,
        raw_text: &str,
        brand: &str,
        original_query: &str,
    ) -> Result<String> {
        let prompt = prompts::extraction_prompt(raw_text, brand, original_query);
        self.openai
            .complete(
                &self.parser_model,
                &ChatRequest {
                    prompt: &prompt,
                    temperature: 0.0,
                    max_tokens: 200,
                },
            )
            .await
    }
}

fn read_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BrandLensError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Model-output parsing helpers
// ---------------------------------------------------------------------------

/// First bracketed array in a blob of prose.
static ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array regex"));

/// Strip Markdown code fences a model may wrap around JSON output.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse a model response as a JSON array of strings.
///
/// Tolerates code fences, an array embedded in surrounding prose, and a JSON
/// string that itself encodes an array (unwrapped once). Anything else is a
/// parse error.
pub fn parse_string_array(raw: &str) -> Result<Vec<String>> {
    let cleaned = strip_code_fences(raw);

    let value: serde_json::Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(_) => {
            let found = ARRAY_RE.find(&cleaned).ok_or_else(|| {
                BrandLensError::parse("output is not valid JSON and contains no array")
            })?;
            serde_json::from_str(found.as_str())
                .map_err(|e| BrandLensError::parse(format!("embedded array is invalid: {e}")))?
        }
    };

    array_of_strings(value)
}

fn array_of_strings(value: serde_json::Value) -> Result<Vec<String>> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(BrandLensError::parse(format!(
                    "array contains a non-string item: {other}"
                ))),
            })
            .collect(),
        serde_json::Value::String(s) if s.trim_start().starts_with('[') => {
            let nested: serde_json::Value = serde_json::from_str(&s)
                .map_err(|e| BrandLensError::parse(format!("nested array is invalid: {e}")))?;
            match nested {
                serde_json::Value::Array(_) => array_of_strings(nested),
                _ => Err(BrandLensError::parse("nested JSON is not an array")),
            }
        }
        _ => Err(BrandLensError::parse("output is not a JSON array")),
    }
}

/// Trim whitespace and surrounding quotes from an industry phrase.
fn clean_industry_phrase(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

/// Drop empty names and the evaluated brand itself (case-insensitive).
fn sanitize_competitor_names(names: Vec<String>, brand: &str) -> Vec<String> {
    let brand_lower = brand.to_lowercase();
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && n.to_lowercase() != brand_lower)
        .collect()
}
