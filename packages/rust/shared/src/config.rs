//! Application configuration for BrandLens.
//!
//! User config lives at `~/.brandlens/brandlens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BrandLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brandlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brandlens";

// ---------------------------------------------------------------------------
// Config structs (matching brandlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenAI settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Anthropic settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Scoring placeholder overrides.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path the flattened-row report artifact is written to.
    #[serde(default = "default_report_path")]
    pub report_path: String,

    /// Default number of queries to generate.
    #[serde(default = "default_num_queries")]
    pub num_queries: u32,

    /// Default target region for query phrasing.
    #[serde(default = "default_region")]
    pub region: String,

    /// Concurrent (query, model) calls during fire-queries and parsing.
    #[serde(default = "default_fire_concurrency")]
    pub fire_concurrency: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            report_path: default_report_path(),
            num_queries: default_num_queries(),
            region: default_region(),
            fire_concurrency: default_fire_concurrency(),
        }
    }
}

fn default_report_path() -> String {
    "output/visibility_report.json".into()
}
fn default_num_queries() -> u32 {
    10
}
fn default_region() -> String {
    "Global".into()
}
fn default_fire_concurrency() -> u32 {
    4
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    /// Model used to answer fired queries.
    #[serde(default = "default_openai_answer_model")]
    pub answer_model: String,

    /// Model used for industry/competitor/query generation.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Model used for structured answer parsing.
    #[serde(default = "default_parser_model")]
    pub parser_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_key_env(),
            answer_model: default_openai_answer_model(),
            generation_model: default_generation_model(),
            parser_model: default_parser_model(),
        }
    }
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_answer_model() -> String {
    "gpt-4o".into()
}
fn default_generation_model() -> String {
    "gpt-4o-mini".into()
}
fn default_parser_model() -> String {
    "gpt-4o-mini".into()
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,

    /// Model used to answer fired queries.
    #[serde(default = "default_anthropic_answer_model")]
    pub answer_model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_key_env(),
            answer_model: default_anthropic_answer_model(),
        }
    }
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_anthropic_answer_model() -> String {
    "claude-haiku-4-5-20251001".into()
}

/// `[scoring]` section — named defaults for composite-score inputs that are
/// configuration, not computed metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Ranking-quality proxy (0–100).
    #[serde(default = "default_ranking_quality")]
    pub ranking_quality: f64,

    /// Bias proxy (0–100); the composite blends `100 - bias`.
    #[serde(default = "default_bias")]
    pub bias: f64,

    /// Hallucination proxy (0–100, higher is better).
    #[serde(default = "default_hallucination")]
    pub hallucination: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ranking_quality: default_ranking_quality(),
            bias: default_bias(),
            hallucination: default_hallucination(),
        }
    }
}

fn default_ranking_quality() -> f64 {
    85.0
}
fn default_bias() -> f64 {
    30.0
}
fn default_hallucination() -> f64 {
    100.0
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brandlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BrandLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brandlens/brandlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BrandLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BrandLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrandLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrandLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrandLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that both provider API key env vars are set and non-empty.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    for var_name in [&config.openai.api_key_env, &config.anthropic.api_key_env] {
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {}
            _ => {
                return Err(BrandLensError::config(format!(
                    "API key not found. Set the {var_name} environment variable."
                )));
            }
        }
    }
    Ok(())
}
