//! Per-model scoring engine and multi-model aggregation.
//!
//! Each engine is a pure function of one model's flattened-row subsequence.
//! Percentages are rounded to 2 decimals at the point of output only, never
//! in intermediate computation.

use serde::{Serialize, Serializer};

use brandlens_shared::{FlattenedRow, OrderedMap, ScoringConfig};

/// Fixed composite blend weights.
const W_RECALL: f64 = 0.25;
const W_RANKING_QUALITY: f64 = 0.20;
const W_COVERAGE: f64 = 0.20;
const W_BIAS: f64 = 0.15;
const W_HALLUCINATION: f64 = 0.10;
const W_FAIRNESS: f64 = 0.10;

/// Round to 2 decimal places for output.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Score bundle types
// ---------------------------------------------------------------------------

/// Named defaults for composite-score inputs that are configuration, not
/// computed metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringDefaults {
    pub ranking_quality: f64,
    pub bias: f64,
    pub hallucination: f64,
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            ranking_quality: 85.0,
            bias: 30.0,
            hallucination: 100.0,
        }
    }
}

impl From<&ScoringConfig> for ScoringDefaults {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            ranking_quality: config.ranking_quality,
            bias: config.bias,
            hallucination: config.hallucination,
        }
    }
}

/// Brand visibility across one model's rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawVisibility {
    pub total_queries: usize,
    pub brand_mentioned: usize,
    pub brand_missing: usize,
    pub visibility_percent: f64,
}

/// Visibility within one query category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryVisibility {
    pub visibility_percent: f64,
}

/// Win/loss ratio against one competitor.
///
/// `Unbounded` is the distinguished value for "wins with zero losses" — not a
/// numeric overflow, and serialized as the string `"unbounded"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WinLossRatio {
    Ratio(f64),
    Unbounded,
}

impl Serialize for WinLossRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ratio(value) => serializer.serialize_f64(*value),
            Self::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// Head-to-head standing against one competitor brand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorStanding {
    /// Rows in which the competitor appeared.
    pub frequency: u64,
    /// Appearances in rows where the evaluated brand was mentioned.
    pub wins: u64,
    /// Appearances in rows where it was not.
    pub losses: u64,
    pub win_loss_ratio: WinLossRatio,
}

/// Competitor-product pressure, sorted descending by frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductScore {
    pub product_frequency: OrderedMap<u64>,
    /// Occurrences in rows where the evaluated brand was absent.
    pub product_replaces_brand: OrderedMap<u64>,
}

/// Composite model-level score and its inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelLevelScore {
    pub recall: f64,
    pub ranking_quality: f64,
    pub coverage: f64,
    pub bias: f64,
    pub hallucination_score: f64,
    pub fairness: f64,
    pub final_model_score: f64,
}

/// Read-only scoring output for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBundle {
    pub model: String,
    pub raw_visibility: RawVisibility,
    pub category_visibility: OrderedMap<CategoryVisibility>,
    pub competitor_score: OrderedMap<CompetitorStanding>,
    pub product_score: ProductScore,
    pub model_level_score: ModelLevelScore,
}

// ---------------------------------------------------------------------------
// Per-model engine
// ---------------------------------------------------------------------------

/// Pure scoring over one model's row subsequence.
pub struct ModelScoringEngine<'a> {
    model: &'a str,
    rows: Vec<&'a FlattenedRow>,
    defaults: ScoringDefaults,
}

impl<'a> ModelScoringEngine<'a> {
    pub fn new(model: &'a str, rows: Vec<&'a FlattenedRow>, defaults: ScoringDefaults) -> Self {
        Self {
            model,
            rows,
            defaults,
        }
    }

    pub fn raw_visibility(&self) -> RawVisibility {
        let total = self.rows.len();
        let mentioned = self.rows.iter().filter(|r| r.brand_mentioned).count();

        let percent = if total == 0 {
            0.0
        } else {
            100.0 * mentioned as f64 / total as f64
        };

        RawVisibility {
            total_queries: total,
            brand_mentioned: mentioned,
            brand_missing: total - mentioned,
            visibility_percent: round2(percent),
        }
    }

    pub fn category_visibility(&self) -> OrderedMap<CategoryVisibility> {
        let mut tallies: Vec<(String, u64, u64)> = Vec::new();

        for row in &self.rows {
            let category = row.category.as_str();
            let idx = match tallies.iter().position(|(c, _, _)| c == category) {
                Some(idx) => idx,
                None => {
                    tallies.push((category.to_string(), 0, 0));
                    tallies.len() - 1
                }
            };
            tallies[idx].1 += 1;
            if row.brand_mentioned {
                tallies[idx].2 += 1;
            }
        }

        tallies
            .into_iter()
            .map(|(category, total, mentioned)| {
                let percent = 100.0 * mentioned as f64 / total as f64;
                (
                    category,
                    CategoryVisibility {
                        visibility_percent: round2(percent),
                    },
                )
            })
            .collect()
    }

    pub fn competitor_score(&self) -> OrderedMap<CompetitorStanding> {
        let mut tallies: Vec<(String, u64, u64, u64)> = Vec::new();

        for row in &self.rows {
            for competitor in &row.competitor_brands {
                let idx = match tallies.iter().position(|(c, ..)| c == competitor) {
                    Some(idx) => idx,
                    None => {
                        tallies.push((competitor.clone(), 0, 0, 0));
                        tallies.len() - 1
                    }
                };
                tallies[idx].1 += 1;
                if row.brand_mentioned {
                    tallies[idx].2 += 1;
                } else {
                    tallies[idx].3 += 1;
                }
            }
        }

        tallies
            .into_iter()
            .map(|(competitor, frequency, wins, losses)| {
                let win_loss_ratio = if losses > 0 {
                    WinLossRatio::Ratio(round2(wins as f64 / losses as f64))
                } else {
                    WinLossRatio::Unbounded
                };
                (
                    competitor,
                    CompetitorStanding {
                        frequency,
                        wins,
                        losses,
                        win_loss_ratio,
                    },
                )
            })
            .collect()
    }

    pub fn product_score(&self) -> ProductScore {
        let mut frequency: Vec<(String, u64)> = Vec::new();
        let mut replaces: Vec<(String, u64)> = Vec::new();

        for row in &self.rows {
            for product in &row.competitor_products {
                bump(&mut frequency, product);
                if !row.brand_mentioned {
                    bump(&mut replaces, product);
                }
            }
        }

        // Descending by count; ties keep first-appearance order.
        frequency.sort_by(|a, b| b.1.cmp(&a.1));
        replaces.sort_by(|a, b| b.1.cmp(&a.1));

        ProductScore {
            product_frequency: frequency.into_iter().collect(),
            product_replaces_brand: replaces.into_iter().collect(),
        }
    }

    pub fn model_level_score(&self) -> ModelLevelScore {
        let relevant: Vec<&&FlattenedRow> = self
            .rows
            .iter()
            .filter(|r| r.category.is_purchase_intent())
            .collect();

        let mentioned = relevant.iter().filter(|r| r.brand_mentioned).count();
        let recall = 100.0 * mentioned as f64 / relevant.len().max(1) as f64;

        let category_visibility = self.category_visibility();
        let coverage = if category_visibility.is_empty() {
            0.0
        } else {
            let sum: f64 = category_visibility
                .iter()
                .map(|(_, v)| v.visibility_percent)
                .sum();
            sum / category_visibility.len() as f64
        };

        let ranking_quality = self.defaults.ranking_quality;
        let bias = self.defaults.bias;
        let hallucination = self.defaults.hallucination;
        let fairness = (recall * 1.2).min(100.0);

        let final_score = W_RECALL * recall
            + W_RANKING_QUALITY * ranking_quality
            + W_COVERAGE * coverage
            + W_BIAS * (100.0 - bias)
            + W_HALLUCINATION * hallucination
            + W_FAIRNESS * fairness;

        ModelLevelScore {
            recall: round2(recall),
            ranking_quality,
            coverage: round2(coverage),
            bias,
            hallucination_score: hallucination,
            fairness: round2(fairness),
            final_model_score: round2(final_score),
        }
    }

    /// Compute the full score bundle.
    pub fn run(&self) -> ScoreBundle {
        ScoreBundle {
            model: self.model.to_string(),
            raw_visibility: self.raw_visibility(),
            category_visibility: self.category_visibility(),
            competitor_score: self.competitor_score(),
            product_score: self.product_score(),
            model_level_score: self.model_level_score(),
        }
    }
}

fn bump(tallies: &mut Vec<(String, u64)>, key: &str) {
    match tallies.iter().position(|(k, _)| k == key) {
        Some(idx) => tallies[idx].1 += 1,
        None => tallies.push((key.to_string(), 1)),
    }
}

// ---------------------------------------------------------------------------
// Multi-model aggregation
// ---------------------------------------------------------------------------

/// Partition rows by model (stable, first-seen order) and run one scoring
/// engine per partition. Partitions are independent; no cross-model state.
pub fn aggregate_scores(
    rows: &[FlattenedRow],
    defaults: ScoringDefaults,
) -> OrderedMap<ScoreBundle> {
    let mut partitions: Vec<(&str, Vec<&FlattenedRow>)> = Vec::new();

    for row in rows {
        match partitions.iter().position(|(model, _)| *model == row.model) {
            Some(idx) => partitions[idx].1.push(row),
            None => partitions.push((&row.model, vec![row])),
        }
    }

    partitions
        .into_iter()
        .map(|(model, partition)| {
            let bundle = ModelScoringEngine::new(model, partition, defaults).run();
            (model.to_string(), bundle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use brandlens_shared::QueryCategory;

    fn row(
        model: &str,
        category: QueryCategory,
        mentioned: bool,
        brands: &[&str],
        products: &[&str],
    ) -> FlattenedRow {
        FlattenedRow {
            query: "q".into(),
            category,
            raw_answer: "a".into(),
            model: model.into(),
            brand_mentioned: mentioned,
            rank: None,
            competitor_brands: brands.iter().map(|s| s.to_string()).collect(),
            competitor_products: products.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn engine<'a>(rows: &'a [FlattenedRow]) -> ModelScoringEngine<'a> {
        ModelScoringEngine::new("openai", rows.iter().collect(), ScoringDefaults::default())
    }

    #[test]
    fn raw_visibility_counts_and_bounds() {
        let rows = vec![
            row("openai", QueryCategory::BestOf, true, &[], &[]),
            row("openai", QueryCategory::BestOf, false, &[], &[]),
            row("openai", QueryCategory::Budget, true, &[], &[]),
        ];

        let visibility = engine(&rows).raw_visibility();
        assert_eq!(visibility.total_queries, 3);
        assert_eq!(
            visibility.brand_mentioned + visibility.brand_missing,
            visibility.total_queries
        );
        assert_eq!(visibility.visibility_percent, 66.67);
        assert!((0.0..=100.0).contains(&visibility.visibility_percent));
    }

    #[test]
    fn raw_visibility_of_empty_rows_is_zero() {
        let rows: Vec<FlattenedRow> = vec![];
        let visibility = engine(&rows).raw_visibility();
        assert_eq!(visibility.total_queries, 0);
        assert_eq!(visibility.visibility_percent, 0.0);
    }

    #[test]
    fn category_visibility_groups_by_category() {
        let rows = vec![
            row("openai", QueryCategory::BestOf, true, &[], &[]),
            row("openai", QueryCategory::BestOf, false, &[], &[]),
            row("openai", QueryCategory::Branded, true, &[], &[]),
        ];

        let by_category = engine(&rows).category_visibility();
        assert_eq!(by_category.len(), 2);
        assert_eq!(
            by_category.get("best_of").unwrap().visibility_percent,
            50.0
        );
        assert_eq!(
            by_category.get("branded").unwrap().visibility_percent,
            100.0
        );
    }

    #[test]
    fn competitor_win_loss_accounting() {
        let rows = vec![
            row("openai", QueryCategory::BestOf, true, &["Umbra"], &[]),
            row("openai", QueryCategory::BestOf, false, &["Umbra"], &[]),
            row("openai", QueryCategory::BestOf, true, &["Umbra", "Sonique"], &[]),
            row("openai", QueryCategory::Budget, false, &["Kite"], &[]),
        ];

        let scores = engine(&rows).competitor_score();

        let umbra = scores.get("Umbra").unwrap();
        assert_eq!(umbra.frequency, 3);
        assert_eq!(umbra.wins, 2);
        assert_eq!(umbra.losses, 1);
        assert_eq!(umbra.win_loss_ratio, WinLossRatio::Ratio(2.0));

        // Unbounded iff losses == 0 and wins > 0
        let sonique = scores.get("Sonique").unwrap();
        assert_eq!((sonique.wins, sonique.losses), (1, 0));
        assert_eq!(sonique.win_loss_ratio, WinLossRatio::Unbounded);

        // Zero iff wins == 0 and losses > 0
        let kite = scores.get("Kite").unwrap();
        assert_eq!((kite.wins, kite.losses), (0, 1));
        assert_eq!(kite.win_loss_ratio, WinLossRatio::Ratio(0.0));
    }

    #[test]
    fn win_loss_ratio_serializes_distinguished_value() {
        let json = serde_json::to_string(&WinLossRatio::Unbounded).unwrap();
        assert_eq!(json, r#""unbounded""#);

        let json = serde_json::to_string(&WinLossRatio::Ratio(1.5)).unwrap();
        assert_eq!(json, "1.5");
    }

    #[test]
    fn product_score_sorts_descending_by_frequency() {
        let rows = vec![
            row("openai", QueryCategory::BestOf, false, &[], &["Umbra Flow X"]),
            row(
                "openai",
                QueryCategory::BestOf,
                true,
                &[],
                &["Umbra Flow X", "Sonique Air"],
            ),
            row("openai", QueryCategory::Budget, false, &[], &["Umbra Flow X"]),
        ];

        let products = engine(&rows).product_score();
        let frequency_keys: Vec<&str> = products.product_frequency.keys().collect();
        assert_eq!(frequency_keys, vec!["Umbra Flow X", "Sonique Air"]);
        assert_eq!(products.product_frequency.get("Umbra Flow X"), Some(&3));

        // replaces-brand counts only no-mention rows
        assert_eq!(products.product_replaces_brand.get("Umbra Flow X"), Some(&2));
        assert_eq!(products.product_replaces_brand.get("Sonique Air"), None);
    }

    #[test]
    fn model_level_score_uses_purchase_intent_subset() {
        let rows = vec![
            row("openai", QueryCategory::Comparison, true, &[], &[]),
            row("openai", QueryCategory::BestOf, false, &[], &[]),
            row("openai", QueryCategory::Budget, true, &[], &[]),
            // branded rows are excluded from recall
            row("openai", QueryCategory::Branded, false, &[], &[]),
        ];

        let score = engine(&rows).model_level_score();

        // recall: 2 of 3 purchase-intent rows
        assert_eq!(score.recall, 66.67);
        assert_eq!(score.ranking_quality, 85.0);
        assert_eq!(score.bias, 30.0);
        assert_eq!(score.hallucination_score, 100.0);
        assert_eq!(score.fairness, 80.0);

        // coverage: mean of 100, 0, 100, 0
        assert_eq!(score.coverage, 50.0);

        // 0.25*66.666… + 0.20*85 + 0.20*50 + 0.15*70 + 0.10*100 + 0.10*80
        assert_eq!(score.final_model_score, 72.17);
    }

    #[test]
    fn all_rows_unmentioned_zeroes_visibility_and_recall() {
        let rows = vec![
            row("openai", QueryCategory::Comparison, false, &[], &[]),
            row("openai", QueryCategory::BestOf, false, &[], &[]),
        ];

        let bundle = engine(&rows).run();
        assert_eq!(bundle.raw_visibility.visibility_percent, 0.0);
        assert_eq!(bundle.model_level_score.recall, 0.0);
        assert_eq!(bundle.model_level_score.fairness, 0.0);
    }

    #[test]
    fn empty_partition_has_no_nan() {
        let rows: Vec<FlattenedRow> = vec![];
        let bundle = engine(&rows).run();
        assert_eq!(bundle.model_level_score.recall, 0.0);
        assert_eq!(bundle.model_level_score.coverage, 0.0);
        assert!(bundle.model_level_score.final_model_score.is_finite());
    }

    #[test]
    fn scoring_overrides_flow_into_composite() {
        let rows = vec![row("openai", QueryCategory::Comparison, true, &[], &[])];
        let defaults = ScoringDefaults {
            ranking_quality: 50.0,
            bias: 0.0,
            hallucination: 0.0,
        };
        let score = ModelScoringEngine::new("openai", rows.iter().collect(), defaults)
            .model_level_score();

        assert_eq!(score.ranking_quality, 50.0);
        // 0.25*100 + 0.20*50 + 0.20*100 + 0.15*100 + 0.10*0 + 0.10*100
        assert_eq!(score.final_model_score, 80.0);
    }

    #[test]
    fn aggregator_partitions_by_model_first_seen() {
        let rows = vec![
            row("openai", QueryCategory::BestOf, true, &[], &[]),
            row("claude", QueryCategory::BestOf, false, &[], &[]),
            row("openai", QueryCategory::Budget, false, &[], &[]),
            row("claude", QueryCategory::Budget, true, &[], &[]),
            row("openai", QueryCategory::Branded, true, &[], &[]),
            row("claude", QueryCategory::Branded, false, &[], &[]),
        ];

        let scores = aggregate_scores(&rows, ScoringDefaults::default());

        let models: Vec<&str> = scores.keys().collect();
        assert_eq!(models, vec!["openai", "claude"]);
        assert_eq!(scores.get("openai").unwrap().raw_visibility.total_queries, 3);
        assert_eq!(scores.get("claude").unwrap().raw_visibility.total_queries, 3);
    }

    #[test]
    fn score_bundle_is_json_serializable() {
        let rows = vec![row(
            "openai",
            QueryCategory::BestOf,
            true,
            &["Umbra"],
            &["Umbra Flow X"],
        )];
        let scores = aggregate_scores(&rows, ScoringDefaults::default());
        let json = serde_json::to_string_pretty(&scores).expect("serialize");

        assert!(json.contains("raw_visibility"));
        assert!(json.contains("\"unbounded\""));
        assert!(json.contains("final_model_score"));
    }
}
