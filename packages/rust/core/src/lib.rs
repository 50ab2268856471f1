//! Pipeline core for BrandLens.
//!
//! The in-scope heart of the system: the stage orchestrator over shared
//! pipeline state, the response parser with its deterministic fallback, the
//! record-to-row flattener, and the per-model scoring engine with its
//! cross-model aggregator. External collaborators (site scraping, model
//! calls) are reached only through the contracts in [`collaborators`].

pub mod collaborators;
pub mod flatten;
pub mod parser;
pub mod pipeline;
pub mod queries;
pub mod scoring;

pub use collaborators::{ModelSuite, SiteSource};
pub use flatten::flatten_records;
pub use parser::{ParsedFields, normalize_raw_answer, parse_extraction_response};
pub use pipeline::{
    PipelineConfig, ProgressReporter, SilentProgress, Stage, VisibilityPipeline,
};
pub use queries::compute_category_distribution;
pub use scoring::{
    CategoryVisibility, CompetitorStanding, ModelLevelScore, ModelScoringEngine, ProductScore,
    RawVisibility, ScoreBundle, ScoringDefaults, WinLossRatio, aggregate_scores,
};
