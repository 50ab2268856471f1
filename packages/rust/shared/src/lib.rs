//! Shared types, error model, and configuration for BrandLens.
//!
//! This crate is the foundation depended on by all other BrandLens crates.
//! It provides:
//! - [`BrandLensError`] — the unified error type
//! - Domain types ([`PipelineState`], [`QueryRecord`], [`FlattenedRow`], [`OrderedMap`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, DefaultsConfig, OpenAiConfig, ScoringConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_keys,
};
pub use error::{BrandLensError, Result};
pub use types::{
    CompetitorMentions, ERROR_SENTINEL, FlattenedRow, OrderedMap, PipelineState, QueryCategory,
    QueryRecord, RunId, RunInput, StageUpdate, is_no_content, short_model_name,
};
