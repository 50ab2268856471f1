//! Query-record → row projection.
//!
//! Expands each record into one independent row per (query, model) pair,
//! keyed strictly by the record's `raw_answer` map — the canonical fan-out.

use brandlens_shared::{CompetitorMentions, FlattenedRow, QueryRecord, short_model_name};

/// Project records into flattened rows.
///
/// Row count equals the sum over records of their `raw_answer` key counts:
/// every fired (query, model) pair yields exactly one row, including pairs
/// whose parsing fell back to defaults. Row order is record order, then
/// `raw_answer` insertion order.
///
/// `rank` is read per-row from the record's rank map. `brand_mentioned` and
/// both competitor lists are taken from the record's *first* parsed map value
/// and shared across all of the record's rows — the established report
/// semantics, kept for output compatibility.
pub fn flatten_records(records: &[QueryRecord]) -> Vec<FlattenedRow> {
    let mut rows = Vec::new();

    for record in records {
        let (competitor_brands, competitor_products) =
            project_competitors(record.competitors.first_value());

        let brand_mentioned = record
            .brand_mentioned
            .first_value()
            .copied()
            .unwrap_or(false);

        for (model_key, raw_answer) in record.raw_answer.iter() {
            let rank = record.rank.get(model_key).copied().flatten();

            rows.push(FlattenedRow {
                query: record.query.clone(),
                category: record.category,
                raw_answer: raw_answer.clone(),
                model: short_model_name(model_key).to_string(),
                brand_mentioned,
                rank,
                competitor_brands: competitor_brands.clone(),
                competitor_products: competitor_products.clone(),
            });
        }
    }

    rows
}

/// Derive the brand-level and product-level competitor lists from one
/// competitor map.
///
/// Product strings are emitted as `"<brand> <product>"` unless the product
/// already starts with the brand name (case-insensitive), which prevents
/// doubled prefixes like "Bose Bose QC45".
fn project_competitors(map: Option<&CompetitorMentions>) -> (Vec<String>, Vec<String>) {
    let mut brands = Vec::new();
    let mut products = Vec::new();

    let Some(map) = map else {
        return (brands, products);
    };

    for (brand, models) in map.iter() {
        brands.push(brand.to_string());

        let Some(models) = models else {
            continue;
        };
        for product in models {
            let product = product.trim();
            if product.is_empty() {
                continue;
            }
            if product.to_lowercase().starts_with(&brand.to_lowercase()) {
                products.push(product.to_string());
            } else {
                products.push(format!("{brand} {product}"));
            }
        }
    }

    (brands, products)
}

#[cfg(test)]
mod tests {
    use super::*;

    use brandlens_shared::{OrderedMap, QueryCategory};

    fn record_with_models(query: &str, models: &[(&str, &str)]) -> QueryRecord {
        let mut record = QueryRecord::new(query, QueryCategory::BestOf);
        for (key, answer) in models {
            record.raw_answer.insert(*key, answer.to_string());
        }
        record
    }

    #[test]
    fn fan_out_one_row_per_raw_answer_key() {
        let records = vec![
            record_with_models("q1", &[("openai:gpt-4o", "a"), ("claude:haiku", "b")]),
            record_with_models("q2", &[("openai:gpt-4o", "c"), ("claude:haiku", "d")]),
            record_with_models("q3", &[("openai:gpt-4o", "e"), ("claude:haiku", "f")]),
        ];

        let rows = flatten_records(&records);

        let expected: usize = records.iter().map(|r| r.raw_answer.len()).sum();
        assert_eq!(rows.len(), expected);
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn record_without_answers_yields_no_rows() {
        let records = vec![QueryRecord::new("unanswered", QueryCategory::Budget)];
        assert!(flatten_records(&records).is_empty());
    }

    #[test]
    fn model_name_is_normalized() {
        let records = vec![record_with_models("q", &[("openai:gpt-4o", "a")])];
        let rows = flatten_records(&records);
        assert_eq!(rows[0].model, "openai");
    }

    #[test]
    fn rank_is_per_model() {
        let mut record =
            record_with_models("q", &[("openai:gpt-4o", "a"), ("claude:haiku", "b")]);
        record.rank.insert("openai:gpt-4o", Some(1));
        record.rank.insert("claude:haiku", None);

        let rows = flatten_records(&[record]);
        assert_eq!(rows[0].rank, Some(1));
        assert_eq!(rows[1].rank, None);
    }

    #[test]
    fn brand_mentioned_is_shared_from_first_parsed_value() {
        // Established semantics: the first model's verdict is copied onto
        // every row of the record, even where the second model disagrees.
        let mut record =
            record_with_models("q", &[("openai:gpt-4o", "a"), ("claude:haiku", "b")]);
        record.brand_mentioned.insert("openai:gpt-4o", true);
        record.brand_mentioned.insert("claude:haiku", false);

        let rows = flatten_records(&[record]);
        assert!(rows[0].brand_mentioned);
        assert!(rows[1].brand_mentioned);
    }

    #[test]
    fn competitor_lists_are_shared_across_rows() {
        let mut record =
            record_with_models("q", &[("openai:gpt-4o", "a"), ("claude:haiku", "b")]);

        let mut first: CompetitorMentions = OrderedMap::new();
        first.insert("Umbra", Some(vec!["Flow X".to_string()]));
        record.competitors.insert("openai:gpt-4o", first);

        let mut second: CompetitorMentions = OrderedMap::new();
        second.insert("Sonique", None);
        record.competitors.insert("claude:haiku", second);

        let rows = flatten_records(&[record]);
        for row in &rows {
            assert_eq!(row.competitor_brands, vec!["Umbra"]);
            assert_eq!(row.competitor_products, vec!["Umbra Flow X"]);
        }
    }

    #[test]
    fn unparsed_record_defaults_to_degraded_row() {
        let records = vec![record_with_models("q", &[("openai:gpt-4o", "raw only")])];
        let rows = flatten_records(&records);

        assert_eq!(rows.len(), 1);
        assert!(!rows[0].brand_mentioned);
        assert_eq!(rows[0].rank, None);
        assert!(rows[0].competitor_brands.is_empty());
        assert!(rows[0].competitor_products.is_empty());
    }

    #[test]
    fn product_prefixing_avoids_duplicate_brand() {
        let mut map: CompetitorMentions = OrderedMap::new();
        map.insert(
            "Bose",
            Some(vec!["Bose QC45".to_string(), "QC35 II".to_string(), "  ".to_string()]),
        );
        map.insert("Sonique", None);

        let (brands, products) = project_competitors(Some(&map));
        assert_eq!(brands, vec!["Bose", "Sonique"]);
        assert_eq!(products, vec!["Bose QC45", "Bose QC35 II"]);
    }

    #[test]
    fn prefix_check_is_case_insensitive() {
        let mut map: CompetitorMentions = OrderedMap::new();
        map.insert("Bose", Some(vec!["bose qc45".to_string()]));

        let (_, products) = project_competitors(Some(&map));
        assert_eq!(products, vec!["bose qc45"]);
    }
}
