//! Response normalization and structured parsing.
//!
//! For each (query record, model key) pair this module turns the model's
//! free-text answer into `{brand_mentioned, rank, competitors}`. The
//! extraction call itself is delegated to a language-model collaborator; the
//! contract — shape validation, sanitization, and the deterministic fallback
//! — is owned here.

use serde::Deserialize;

use brandlens_llm::strip_code_fences;
use brandlens_shared::{CompetitorMentions, OrderedMap};

/// Known free-text fields of a structured answer payload, in match order.
const ANSWER_TEXT_KEYS: [&str; 4] = ["summary", "answer", "text", "response"];

/// Retailers, marketplaces, and aggregators never admitted as competitors,
/// no matter what the extractor returns.
const COMPETITOR_DENYLIST: [&str; 18] = [
    "amazon",
    "flipkart",
    "walmart",
    "target",
    "best buy",
    "ebay",
    "aliexpress",
    "shopify",
    "newegg",
    "croma",
    "reliance digital",
    "jd.com",
    "mercadolibre",
    "lazada",
    "online store",
    "retailer",
    "marketplace",
    "website",
];

/// Parsed visibility fields for one (query, model) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFields {
    pub brand_mentioned: bool,
    pub rank: Option<u32>,
    pub competitors: CompetitorMentions,
}

impl ParsedFields {
    /// Deterministic fallback assigned whenever extraction fails.
    pub fn fallback() -> Self {
        Self {
            brand_mentioned: false,
            rank: None,
            competitors: OrderedMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw-answer normalization
// ---------------------------------------------------------------------------

/// Normalize a raw model answer into plain text. Pure and total.
///
/// A missing answer yields the empty string. If the answer is a JSON object,
/// the first of [`ANSWER_TEXT_KEYS`] present supplies the text (string values
/// used verbatim, other values serialized); an object with none of the keys
/// is re-serialized whole. Anything else passes through unchanged.
pub fn normalize_raw_answer(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    if let Ok(serde_json::Value::Object(payload)) =
        serde_json::from_str::<serde_json::Value>(raw)
    {
        for key in ANSWER_TEXT_KEYS {
            if let Some(value) = payload.get(key) {
                return match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
            }
        }
        return serde_json::Value::Object(payload).to_string();
    }

    raw.to_string()
}

// ---------------------------------------------------------------------------
// Extraction-response parsing
// ---------------------------------------------------------------------------

/// Wire shape of the extraction record. Missing fields default; wrong types
/// fail the whole record and trigger the fallback.
#[derive(Debug, Deserialize)]
struct ExtractionWire {
    #[serde(default)]
    brand_mentioned: bool,
    #[serde(default)]
    rank: Option<i64>,
    #[serde(default)]
    competitors: Option<CompetitorMentions>,
}

/// Parse one extraction response into fields.
///
/// Total: extraction output that is not JSON (after stripping code fences) or
/// does not match the expected shape yields [`ParsedFields::fallback`].
pub fn parse_extraction_response(raw: &str, brand: &str) -> ParsedFields {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<ExtractionWire>(&cleaned) {
        Ok(wire) => sanitize(wire, brand),
        Err(_) => ParsedFields::fallback(),
    }
}

/// Enforce the competitor rules the extractor is asked to follow but cannot
/// be trusted with: denylist, self-exclusion, dedup, order preservation.
fn sanitize(wire: ExtractionWire, brand: &str) -> ParsedFields {
    let rank = wire
        .rank
        .and_then(|r| u32::try_from(r).ok())
        .filter(|r| *r >= 1);

    let brand_lower = brand.trim().to_lowercase();
    let mut competitors: CompetitorMentions = OrderedMap::new();
    let mut seen_lower: Vec<String> = Vec::new();

    for (name, products) in wire.competitors.unwrap_or_default() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let lower = name.to_lowercase();
        if lower == brand_lower
            || COMPETITOR_DENYLIST.contains(&lower.as_str())
            || seen_lower.contains(&lower)
        {
            continue;
        }
        seen_lower.push(lower);
        competitors.insert(name, products.map(clean_products));
    }

    ParsedFields {
        brand_mentioned: wire.brand_mentioned,
        rank,
        competitors,
    }
}

/// Trim product names, drop empties, collapse duplicates in order.
fn clean_products(products: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for product in products {
        let cleaned = product.trim();
        if cleaned.is_empty() || out.iter().any(|p| p == cleaned) {
            continue;
        }
        out.push(cleaned.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- normalization ---

    #[test]
    fn normalize_missing_answer_is_empty() {
        assert_eq!(normalize_raw_answer(None), "");
    }

    #[test]
    fn normalize_passes_plain_text_through() {
        let text = "The Acme Pulse 3 is a solid pick.";
        assert_eq!(normalize_raw_answer(Some(text)), text);
    }

    #[test]
    fn normalize_extracts_first_known_key() {
        let payload = r#"{"answer": "from answer", "text": "from text"}"#;
        assert_eq!(normalize_raw_answer(Some(payload)), "from answer");

        let payload = r#"{"summary": "from summary", "answer": "from answer"}"#;
        assert_eq!(normalize_raw_answer(Some(payload)), "from summary");
    }

    #[test]
    fn normalize_serializes_non_string_field_values() {
        let payload = r#"{"text": {"nested": true}}"#;
        assert_eq!(normalize_raw_answer(Some(payload)), r#"{"nested":true}"#);
    }

    #[test]
    fn normalize_reserializes_unknown_objects() {
        let payload = r#"{"something_else": 1}"#;
        let normalized = normalize_raw_answer(Some(payload));
        assert_eq!(normalized, r#"{"something_else":1}"#);
    }

    #[test]
    fn normalize_is_total_over_garbage() {
        // Not JSON, not empty, includes odd bytes — must come back unchanged.
        let garbage = "\u{fffd}\u{0} {{{ not json";
        assert_eq!(normalize_raw_answer(Some(garbage)), garbage);
        assert_eq!(normalize_raw_answer(Some("")), "");
    }

    // --- extraction parsing ---

    #[test]
    fn parse_well_formed_record() {
        let raw = r#"{"brand_mentioned": true, "rank": 2,
                      "competitors": {"Umbra": ["Flow X"], "Sonique": null}}"#;
        let fields = parse_extraction_response(raw, "Acme");

        assert!(fields.brand_mentioned);
        assert_eq!(fields.rank, Some(2));
        assert_eq!(
            fields.competitors.get("Umbra"),
            Some(&Some(vec!["Flow X".to_string()]))
        );
        assert_eq!(fields.competitors.get("Sonique"), Some(&None));
    }

    #[test]
    fn parse_accepts_fenced_output() {
        let raw = "```json\n{\"brand_mentioned\": true, \"rank\": null, \"competitors\": {}}\n```";
        let fields = parse_extraction_response(raw, "Acme");
        assert!(fields.brand_mentioned);
        assert_eq!(fields.rank, None);
    }

    #[test]
    fn parse_falls_back_on_non_json() {
        let fields = parse_extraction_response("sorry, I can't help with that", "Acme");
        assert_eq!(fields, ParsedFields::fallback());
    }

    #[test]
    fn parse_falls_back_on_wrong_shape() {
        // rank as prose breaks the record shape entirely
        let raw = r#"{"brand_mentioned": true, "rank": "first", "competitors": {}}"#;
        let fields = parse_extraction_response(raw, "Acme");
        assert_eq!(fields, ParsedFields::fallback());
    }

    #[test]
    fn parse_defaults_missing_fields() {
        let fields = parse_extraction_response(r#"{"rank": 3}"#, "Acme");
        assert!(!fields.brand_mentioned);
        assert_eq!(fields.rank, Some(3));
        assert!(fields.competitors.is_empty());
    }

    #[test]
    fn rank_must_be_a_positive_integer() {
        let fields = parse_extraction_response(
            r#"{"brand_mentioned": false, "rank": 0, "competitors": {}}"#,
            "Acme",
        );
        assert_eq!(fields.rank, None);

        let fields = parse_extraction_response(
            r#"{"brand_mentioned": false, "rank": -2, "competitors": {}}"#,
            "Acme",
        );
        assert_eq!(fields.rank, None);
    }

    #[test]
    fn denylist_excludes_retailers_regardless_of_input() {
        let raw = r#"{"brand_mentioned": false, "rank": null,
                      "competitors": {"Amazon": null, "Umbra": ["Flow X"], "Flipkart": ["whatever"]}}"#;
        let fields = parse_extraction_response(raw, "Acme");

        assert!(!fields.competitors.contains_key("Amazon"));
        assert!(!fields.competitors.contains_key("Flipkart"));
        assert!(fields.competitors.contains_key("Umbra"));
        assert_eq!(fields.competitors.len(), 1);
    }

    #[test]
    fn evaluated_brand_is_excluded_case_insensitively() {
        let raw = r#"{"brand_mentioned": true, "rank": 1,
                      "competitors": {"ACME": ["Pulse 3"], "Umbra": null}}"#;
        let fields = parse_extraction_response(raw, "Acme");

        assert!(!fields.competitors.contains_key("ACME"));
        assert_eq!(fields.competitors.len(), 1);
    }

    #[test]
    fn duplicate_competitors_collapse_keeping_first() {
        let raw = r#"{"brand_mentioned": false, "rank": null,
                      "competitors": {"Umbra": ["Flow X"], "umbra": ["Flow Y"]}}"#;
        let fields = parse_extraction_response(raw, "Acme");

        assert_eq!(fields.competitors.len(), 1);
        assert_eq!(
            fields.competitors.get("Umbra"),
            Some(&Some(vec!["Flow X".to_string()]))
        );
    }

    #[test]
    fn product_lists_are_trimmed_and_deduped() {
        let raw = r#"{"brand_mentioned": false, "rank": null,
                      "competitors": {"Umbra": [" Flow X ", "", "Flow X", "Flow Mini"]}}"#;
        let fields = parse_extraction_response(raw, "Acme");

        assert_eq!(
            fields.competitors.get("Umbra"),
            Some(&Some(vec!["Flow X".to_string(), "Flow Mini".to_string()]))
        );
    }
}
