//! Core domain types for BrandLens visibility runs.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{BrandLensError, Result};

/// Prefix marking a collaborator result as "no usable content".
///
/// The scrape collaborator returns text starting with this sentinel instead
/// of raising; downstream stages degrade rather than abort.
pub const ERROR_SENTINEL: &str = "ERROR";

/// True when upstream content is absent or carries the error sentinel.
pub fn is_no_content(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.starts_with(ERROR_SENTINEL)
}

/// Normalized model name for a wire model key: the text before the first `:`.
///
/// Wire keys look like `openai:gpt-4o`; flattened rows carry `openai`.
pub fn short_model_name(key: &str) -> &str {
    key.split_once(':').map(|(prefix, _)| prefix).unwrap_or(key)
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// OrderedMap
// ---------------------------------------------------------------------------

/// An insertion-ordered string-keyed map, serialized as a JSON object.
///
/// Used everywhere the pipeline keys data by an identifier whose first-seen
/// order matters: per-model answer maps (keys are wire model keys such as
/// `openai:gpt-4o`), competitor maps (keys are competitor brand names), and
/// frequency tables. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace, keeping the key's original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The first inserted value, if any.
    pub fn first_value(&self) -> Option<&V> {
        self.entries.first().map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

// ---------------------------------------------------------------------------
// QueryCategory
// ---------------------------------------------------------------------------

/// Buyer-intent category a generated query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    BestOf,
    Budget,
    Comparison,
    Branded,
    Competitor,
}

impl QueryCategory {
    /// All categories in generation order.
    pub const ALL: [QueryCategory; 5] = [
        QueryCategory::BestOf,
        QueryCategory::Budget,
        QueryCategory::Comparison,
        QueryCategory::Branded,
        QueryCategory::Competitor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestOf => "best_of",
            Self::Budget => "budget",
            Self::Comparison => "comparison",
            Self::Branded => "branded",
            Self::Competitor => "competitor",
        }
    }

    /// Share of the total query budget assigned to this category.
    pub fn weight(&self) -> f64 {
        match self {
            Self::BestOf => 0.25,
            Self::Budget => 0.15,
            Self::Comparison => 0.20,
            Self::Branded => 0.20,
            Self::Competitor => 0.20,
        }
    }

    /// Categories the composite model-level score is restricted to.
    pub fn is_purchase_intent(&self) -> bool {
        matches!(self, Self::Comparison | Self::BestOf | Self::Budget)
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// QueryRecord
// ---------------------------------------------------------------------------

/// Per-model competitor mentions: competitor brand → product names seen,
/// or `None` when the brand appeared without a specific product.
pub type CompetitorMentions = OrderedMap<Option<Vec<String>>>;

/// One generated search query plus its per-model raw and parsed answer state.
///
/// The key set of `raw_answer` is the single source of truth for which models
/// answered this query; the parsed maps are keyed by the same wire keys once
/// parsing completes (a strict subset if a model produced no answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    pub category: QueryCategory,

    /// Wire model key (`provider:model-id`) → raw answer text.
    #[serde(default)]
    pub raw_answer: OrderedMap<String>,

    /// Wire model key → whether the brand was mentioned.
    #[serde(default)]
    pub brand_mentioned: OrderedMap<bool>,

    /// Wire model key → the brand's 1-based rank, if enumerable.
    #[serde(default)]
    pub rank: OrderedMap<Option<u32>>,

    /// Wire model key → competitor brand → products.
    #[serde(default)]
    pub competitors: OrderedMap<CompetitorMentions>,
}

impl QueryRecord {
    /// Create an empty record; only query text and category are set.
    pub fn new(query: impl Into<String>, category: QueryCategory) -> Self {
        Self {
            query: query.into(),
            category,
            raw_answer: OrderedMap::new(),
            brand_mentioned: OrderedMap::new(),
            rank: OrderedMap::new(),
            competitors: OrderedMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// FlattenedRow
// ---------------------------------------------------------------------------

/// One (query, model) observation — the atomic unit for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedRow {
    pub query: String,
    pub category: QueryCategory,
    pub raw_answer: String,
    /// Normalized model name (wire key with the `:model-id` suffix stripped).
    pub model: String,
    pub brand_mentioned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub competitor_brands: Vec<String>,
    pub competitor_products: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// Immutable identity inputs for one visibility run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    pub brand_name: String,
    pub website_url: String,
    pub region: String,
    pub num_queries: u32,
}

impl RunInput {
    /// Validate the process-boundary input constraints.
    pub fn validate(&self) -> Result<()> {
        if self.brand_name.trim().is_empty() {
            return Err(BrandLensError::validation("brand name must be non-empty"));
        }
        if self.num_queries < 10 {
            return Err(BrandLensError::validation(format!(
                "num_queries must be at least 10, got {}",
                self.num_queries
            )));
        }
        Ok(())
    }
}

/// The single record threaded through every pipeline stage.
///
/// Owned exclusively by the orchestrator; stages receive a read-only view and
/// return a [`StageUpdate`] delta which the orchestrator merges. Every derived
/// field is `None` until its producing stage completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub run_id: RunId,
    pub input: RunInput,

    /// Extracted website text (may carry the `"ERROR"` sentinel).
    pub site_text: Option<String>,
    /// Detected industry phrase (`"unknown"` when undetectable).
    pub industry: Option<String>,
    /// Discovered competitor brand names.
    pub competitors: Option<Vec<String>>,
    /// Generated query records with per-model answer state.
    pub records: Option<Vec<QueryRecord>>,
    /// Flattened (query, model) rows — the terminal artifact.
    pub rows: Option<Vec<FlattenedRow>>,
}

impl PipelineState {
    pub fn new(input: RunInput) -> Self {
        Self {
            run_id: RunId::new(),
            input,
            site_text: None,
            industry: None,
            competitors: None,
            records: None,
            rows: None,
        }
    }

    /// Merge a stage's partial update. Fields the stage did not produce are
    /// left untouched.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(text) = update.site_text {
            self.site_text = Some(text);
        }
        if let Some(industry) = update.industry {
            self.industry = Some(industry);
        }
        if let Some(competitors) = update.competitors {
            self.competitors = Some(competitors);
        }
        if let Some(records) = update.records {
            self.records = Some(records);
        }
        if let Some(rows) = update.rows {
            self.rows = Some(rows);
        }
    }
}

/// A stage's partial state update — the only way state changes.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    pub site_text: Option<String>,
    pub industry: Option<String>,
    pub competitors: Option<Vec<String>>,
    pub records: Option<Vec<QueryRecord>>,
    pub rows: Option<Vec<FlattenedRow>>,
}
