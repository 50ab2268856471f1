//! Pipeline orchestration: a fixed linear stage sequence over shared state.
//!
//! The orchestrator owns the only mutable [`PipelineState`]; every stage
//! receives a read-only view and returns a [`StageUpdate`] delta that is
//! merged before the next stage runs. There is no branching, no retry, and no
//! global abort path: degraded upstream content flows through as sentinel or
//! empty values and the run always completes.
//!
//! Dropping the run future cancels any in-flight fan-out tasks (their
//! `JoinSet` aborts on drop); stage outputs already merged into the state are
//! never rolled back.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use brandlens_shared::{
    AppConfig, OrderedMap, PipelineState, QueryRecord, Result, RunInput, StageUpdate,
    is_no_content,
};

use crate::collaborators::{ModelSuite, SiteSource};
use crate::flatten;
use crate::parser::{self, ParsedFields};
use crate::queries;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The seven pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scrape,
    DetectIndustry,
    DiscoverCompetitors,
    GenerateQueries,
    FireQueries,
    ParseResponses,
    Flatten,
}

impl Stage {
    /// The fixed execution sequence.
    pub const ALL: [Stage; 7] = [
        Stage::Scrape,
        Stage::DetectIndustry,
        Stage::DiscoverCompetitors,
        Stage::GenerateQueries,
        Stage::FireQueries,
        Stage::ParseResponses,
        Stage::Flatten,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::DetectIndustry => "detect-industry",
            Self::DiscoverCompetitors => "discover-competitors",
            Self::GenerateQueries => "generate-queries",
            Self::FireQueries => "fire-queries",
            Self::ParseResponses => "parse-responses",
            Self::Flatten => "flatten",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for driving a progress indicator.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage begins.
    fn stage_started(&self, stage: Stage);
    /// Called after a stage completes, with `completed / total` stages done.
    fn stage_completed(&self, stage: Stage, completed: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_completed(&self, _stage: Stage, _completed: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Orchestrator configuration — injected, never read from ambient state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where the flattened-row artifact is persisted.
    pub report_path: PathBuf,
    /// Bound on concurrent (query, model) units in fire/parse stages.
    pub fire_concurrency: usize,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            report_path: PathBuf::from(&config.defaults.report_path),
            fire_concurrency: config.defaults.fire_concurrency.max(1) as usize,
        }
    }
}

/// The visibility pipeline over a site source and a model suite.
pub struct VisibilityPipeline<S, M> {
    config: PipelineConfig,
    site: Arc<S>,
    models: Arc<M>,
}

impl<S, M> VisibilityPipeline<S, M>
where
    S: SiteSource + 'static,
    M: ModelSuite + 'static,
{
    pub fn new(config: PipelineConfig, site: S, models: M) -> Self {
        Self {
            config,
            site: Arc::new(site),
            models: Arc::new(models),
        }
    }

    /// Run all stages in order and return the final state.
    ///
    /// The only error path is input validation; once the run starts, every
    /// stage degrades instead of failing.
    #[instrument(skip_all, fields(brand = %input.brand_name, region = %input.region))]
    pub async fn run(
        &self,
        input: RunInput,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineState> {
        input.validate()?;

        let mut state = PipelineState::new(input);
        let total = Stage::ALL.len();

        info!(run_id = %state.run_id, num_queries = state.input.num_queries, "starting visibility run");

        for (i, stage) in Stage::ALL.into_iter().enumerate() {
            progress.stage_started(stage);
            let update = self.run_stage(stage, &state).await;
            state.apply(update);
            progress.stage_completed(stage, i + 1, total);
            info!(stage = %stage, completed = i + 1, total, "stage complete");
        }

        Ok(state)
    }

    async fn run_stage(&self, stage: Stage, state: &PipelineState) -> StageUpdate {
        match stage {
            Stage::Scrape => self.stage_scrape(state).await,
            Stage::DetectIndustry => self.stage_detect_industry(state).await,
            Stage::DiscoverCompetitors => self.stage_discover_competitors(state).await,
            Stage::GenerateQueries => self.stage_generate_queries(state).await,
            Stage::FireQueries => self.stage_fire_queries(state).await,
            Stage::ParseResponses => self.stage_parse_responses(state).await,
            Stage::Flatten => self.stage_flatten(state),
        }
    }

    // --- Stage 1: scrape ---

    async fn stage_scrape(&self, state: &PipelineState) -> StageUpdate {
        let text = self.site.site_text(&state.input.website_url).await;
        StageUpdate {
            site_text: Some(text),
            ..Default::default()
        }
    }

    // --- Stage 2: detect industry ---

    async fn stage_detect_industry(&self, state: &PipelineState) -> StageUpdate {
        let site_text = state.site_text.as_deref().unwrap_or("");

        let industry = if is_no_content(site_text) {
            "unknown".to_string()
        } else {
            match self.models.detect_industry(site_text).await {
                Ok(industry) if !industry.trim().is_empty() => industry,
                Ok(_) => "unknown".to_string(),
                Err(e) => {
                    warn!(error = %e, "industry detection failed, using 'unknown'");
                    "unknown".to_string()
                }
            }
        };

        StageUpdate {
            industry: Some(industry),
            ..Default::default()
        }
    }

    // --- Stage 3: discover competitors ---

    async fn stage_discover_competitors(&self, state: &PipelineState) -> StageUpdate {
        let site_text = state.site_text.as_deref().unwrap_or("");
        let industry = state.industry.as_deref().unwrap_or("unknown");

        let competitors = if is_no_content(site_text) {
            Vec::new()
        } else {
            match self
                .models
                .discover_competitors(&state.input.brand_name, industry, site_text)
                .await
            {
                Ok(competitors) => competitors,
                Err(e) => {
                    warn!(error = %e, "competitor discovery failed, continuing without");
                    Vec::new()
                }
            }
        };

        StageUpdate {
            competitors: Some(competitors),
            ..Default::default()
        }
    }

    // --- Stage 4: generate queries ---

    async fn stage_generate_queries(&self, state: &PipelineState) -> StageUpdate {
        let input = &state.input;
        let industry = state.industry.as_deref().unwrap_or("").to_string();
        let competitors = state.competitors.clone().unwrap_or_default();

        let mut records: Vec<QueryRecord> = Vec::new();

        for (category, count) in queries::compute_category_distribution(input.num_queries) {
            if count == 0 {
                continue;
            }

            match self
                .models
                .generate_queries(
                    category,
                    &input.brand_name,
                    &industry,
                    &competitors,
                    &input.region,
                    count as usize,
                )
                .await
            {
                Ok(texts) => {
                    records.extend(
                        texts
                            .into_iter()
                            .map(|query| QueryRecord::new(query, category)),
                    );
                }
                // Fatal for this category's quota only.
                Err(e) => warn!(category = %category, error = %e, "category quota unmet, skipping"),
            }
        }

        StageUpdate {
            records: Some(records),
            ..Default::default()
        }
    }

    // --- Stage 5: fire queries ---

    /// Fan every query out across the model set. Queries are independent and
    /// run concurrently under the configured bound; each task owns exactly
    /// its record's `raw_answer` slot, so completion order is irrelevant.
    async fn stage_fire_queries(&self, state: &PipelineState) -> StageUpdate {
        let Some(records) = state.records.as_ref() else {
            return StageUpdate::default();
        };
        let mut records = records.clone();

        let semaphore = Arc::new(Semaphore::new(self.config.fire_concurrency));
        let mut tasks = JoinSet::new();

        for (idx, record) in records.iter().enumerate() {
            let models = Arc::clone(&self.models);
            let semaphore = Arc::clone(&semaphore);
            let query = record.query.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                (idx, models.answer_query(&query).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, answers)) => records[idx].raw_answer = answers,
                Err(e) => warn!(error = %e, "fire-queries task failed"),
            }
        }

        StageUpdate {
            records: Some(records),
            ..Default::default()
        }
    }

    // --- Stage 6: parse responses ---

    /// Parse every (query, model) pair's answer into structured fields.
    ///
    /// Pairs run concurrently; results are re-inserted in `raw_answer` key
    /// order so the parsed maps' iteration order is deterministic regardless
    /// of completion order. A failed extraction yields the deterministic
    /// fallback for that pair only.
    async fn stage_parse_responses(&self, state: &PipelineState) -> StageUpdate {
        let Some(records) = state.records.as_ref() else {
            return StageUpdate::default();
        };
        let mut records = records.clone();
        let brand = state.input.brand_name.clone();

        let semaphore = Arc::new(Semaphore::new(self.config.fire_concurrency));
        let mut tasks = JoinSet::new();

        for (idx, record) in records.iter().enumerate() {
            for (model_key, raw) in record.raw_answer.iter() {
                let models = Arc::clone(&self.models);
                let semaphore = Arc::clone(&semaphore);
                let brand = brand.clone();
                let query = record.query.clone();
                let model_key = model_key.to_string();
                let raw = raw.clone();

                tasks.spawn(async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    let text = parser::normalize_raw_answer(Some(&raw));
                    let fields = match models.extract_fields(&text, &brand, &query).await {
                        Ok(response) => parser::parse_extraction_response(&response, &brand),
                        Err(e) => {
                            warn!(model = %model_key, error = %e, "extraction failed, using fallback");
                            ParsedFields::fallback()
                        }
                    };
                    (idx, model_key, fields)
                });
            }
        }

        let mut by_slot: HashMap<(usize, String), ParsedFields> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, model_key, fields)) => {
                    by_slot.insert((idx, model_key), fields);
                }
                Err(e) => warn!(error = %e, "parse-responses task failed"),
            }
        }

        // Rebuild the parsed maps from scratch, in raw_answer key order.
        for (idx, record) in records.iter_mut().enumerate() {
            record.brand_mentioned = OrderedMap::new();
            record.rank = OrderedMap::new();
            record.competitors = OrderedMap::new();

            let keys: Vec<String> = record.raw_answer.keys().map(str::to_string).collect();
            for key in keys {
                let fields = by_slot
                    .remove(&(idx, key.clone()))
                    .unwrap_or_else(ParsedFields::fallback);
                record.brand_mentioned.insert(key.clone(), fields.brand_mentioned);
                record.rank.insert(key.clone(), fields.rank);
                record.competitors.insert(key, fields.competitors);
            }
        }

        StageUpdate {
            records: Some(records),
            ..Default::default()
        }
    }

    // --- Stage 7: flatten ---

    fn stage_flatten(&self, state: &PipelineState) -> StageUpdate {
        let records = state.records.as_deref().unwrap_or(&[]);
        let rows = flatten::flatten_records(records);

        // Persistence failure degrades: rows stay available in state.
        if let Err(e) = brandlens_report::write_rows(&self.config.report_path, &rows) {
            warn!(error = %e, "failed to persist report artifact");
        }

        StageUpdate {
            rows: Some(rows),
            ..Default::default()
        }
    }
}
