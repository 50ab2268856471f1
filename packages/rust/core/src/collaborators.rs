//! Contracts for the pipeline's external collaborators.
//!
//! The core owns these interfaces; the live implementations come from the
//! `brandlens-scrape` and `brandlens-llm` crates and are bound to the traits
//! here. Tests substitute stubs, so no stage logic ever touches the network.

use std::future::Future;

use brandlens_shared::{OrderedMap, QueryCategory, Result};

/// Website text extraction.
pub trait SiteSource: Send + Sync {
    /// Extract readable text for a site, or an `"ERROR"`-prefixed sentinel
    /// when no usable content could be fetched. Total — never errors.
    fn site_text(&self, url: &str) -> impl Future<Output = String> + Send;
}

/// Language-model operations the pipeline depends on.
pub trait ModelSuite: Send + Sync {
    /// Classify the brand's commercial industry from site text.
    fn detect_industry(&self, site_text: &str) -> impl Future<Output = Result<String>> + Send;

    /// Discover direct competitor brand names.
    fn discover_competitors(
        &self,
        brand: &str,
        industry: &str,
        site_text: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Generate `count` buyer-intent queries for one category.
    ///
    /// Failures are [`brandlens_shared::BrandLensError::QueryGeneration`] —
    /// fatal for that category's quota only.
    fn generate_queries(
        &self,
        category: QueryCategory,
        brand: &str,
        industry: &str,
        competitors: &[String],
        region: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fire one query at the fixed model set.
    ///
    /// Total: a provider failure becomes an `"ERROR: …"` answer string in
    /// that model's slot, so every fired pair still yields a row.
    fn answer_query(&self, query: &str) -> impl Future<Output = OrderedMap<String>> + Send;

    /// Run structured extraction over one normalized answer, returning the
    /// extractor's raw output. Shape validation is owned by the parser.
    fn extract_fields(
        &self,
        raw_text: &str,
        brand: &str,
        query: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// Live bindings
// ---------------------------------------------------------------------------

impl SiteSource for brandlens_scrape::SiteExtractor {
    fn site_text(&self, url: &str) -> impl Future<Output = String> + Send {
        self.extract_site_text(url)
    }
}

impl ModelSuite for brandlens_llm::LlmSuite {
    fn detect_industry(&self, site_text: &str) -> impl Future<Output = Result<String>> + Send {
        brandlens_llm::LlmSuite::detect_industry(self, site_text)
    }

    fn discover_competitors(
        &self,
        brand: &str,
        industry: &str,
        site_text: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        brandlens_llm::LlmSuite::discover_competitors(self, brand, industry, site_text)
    }

    fn generate_queries(
        &self,
        category: QueryCategory,
        brand: &str,
        industry: &str,
        competitors: &[String],
        region: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        brandlens_llm::LlmSuite::generate_queries(
            self,
            category,
            brand,
            industry,
            competitors,
            region,
            count,
        )
    }

    fn answer_query(&self, query: &str) -> impl Future<Output = OrderedMap<String>> + Send {
        brandlens_llm::LlmSuite::answer_query(self, query)
    }

    fn extract_fields(
        &self,
        raw_text: &str,
        brand: &str,
        query: &str,
    ) -> impl Future<Output = Result<String>> + Send {
        brandlens_llm::LlmSuite::extract_fields(self, raw_text, brand, query)
    }
}
