//! Lightweight web search used to ground fired queries.
//!
//! Mirrors how search-enabled assistants work: run the query against a
//! search index, pull a short text snippet from each hit, and hand the
//! numbered result block to the answering model. Every failure here degrades
//! to an empty result — grounding is best-effort.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use brandlens_shared::{BrandLensError, Result};

const DDG_LITE: &str = "https://lite.duckduckgo.com/lite/";

/// Snippet cap, in characters — a natural-sized excerpt per source.
const SNIPPET_MAX_CHARS: usize = 2000;

/// Search hits pulled per query.
const MAX_RESULTS: usize = 5;

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Client for DuckDuckGo Lite search plus snippet fetching.
pub struct SearchClient {
    client: Client,
    search_url: String,
}

impl SearchClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                BrandLensError::Network(format!("failed to build search HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            search_url: DDG_LITE.to_string(),
        })
    }

    /// Point the client at a mock search endpoint.
    #[cfg(test)]
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    /// Run a search, returning up to [`MAX_RESULTS`] hits (empty on failure).
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        let response = match self
            .client
            .get(&self.search_url)
            .query(&[("q", query)])
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!(status = %resp.status(), "search returned non-success");
                return Vec::new();
            }
            Err(e) => {
                debug!(error = %e, "search request failed");
                return Vec::new();
            }
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => return Vec::new(),
        };

        parse_result_links(&body)
    }

    /// Fetch a page and return a bounded text snippet (empty on failure).
    pub async fn page_snippet(&self, url: &str) -> String {
        if Url::parse(url).is_err() {
            return String::new();
        }

        let body = match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => return String::new(),
        };

        let text = brandlens_scrape::clean_text(&body);
        text.chars().take(SNIPPET_MAX_CHARS).collect()
    }

    /// Build the numbered WEB RESULTS block for one query.
    ///
    /// Hits whose pages yield no snippet are dropped, matching how a search
    /// assistant only cites sources it could read.
    pub async fn web_results_block(&self, query: &str) -> String {
        let hits = self.search(query).await;
        let mut blocks = Vec::new();

        for (i, hit) in hits.iter().enumerate() {
            let snippet = self.page_snippet(&hit.url).await;
            if snippet.is_empty() {
                continue;
            }
            blocks.push(format!(
                "[{}] {}\nURL: {}\n{}",
                i + 1,
                hit.title,
                hit.url,
                snippet
            ));
        }

        blocks.join("\n\n")
    }
}

/// Extract result links from a DuckDuckGo Lite response body.
fn parse_result_links(body: &str) -> Vec<SearchHit> {
    let doc = Html::parse_document(body);
    let link_sel = Selector::parse("a.result-link").expect("result link selector");

    doc.select(&link_sel)
        .take(MAX_RESULTS)
        .filter_map(|a| {
            let url = a.value().attr("href")?.to_string();
            let title = a.text().collect::<String>().trim().to_string();
            Some(SearchHit { title, url })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_BODY: &str = r#"<html><body><table>
        <tr><td><a class="result-link" href="https://a.example/one">First hit</a></td></tr>
        <tr><td><a class="result-link" href="https://b.example/two">Second hit</a></td></tr>
        <tr><td><a href="https://c.example/ad">Not a result</a></td></tr>
    </table></body></html>"#;

    #[test]
    fn parse_result_links_selects_result_anchors() {
        let hits = parse_result_links(DDG_BODY);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "First hit");
        assert_eq!(hits[0].url, "https://a.example/one");
    }

    #[test]
    fn parse_result_links_caps_results() {
        let many: String = (0..10)
            .map(|i| format!(r#"<a class="result-link" href="https://x.example/{i}">Hit {i}</a>"#))
            .collect();
        let hits = parse_result_links(&many);
        assert_eq!(hits.len(), MAX_RESULTS);
    }

    #[tokio::test]
    async fn search_degrades_to_empty_on_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SearchClient::new().unwrap().with_search_url(server.uri());
        let hits = client.search("best headphones").await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn web_results_block_numbers_sources() {
        let server = wiremock::MockServer::start().await;

        let page_url = format!("{}/page", server.uri());
        let ddg_body = format!(
            r#"<a class="result-link" href="{page_url}">A source</a>"#
        );

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/lite"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(ddg_body))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/page"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                "<html><body><p>Snippet content about headphones</p></body></html>",
            ))
            .mount(&server)
            .await;

        let client = SearchClient::new()
            .unwrap()
            .with_search_url(format!("{}/lite", server.uri()));

        let block = client.web_results_block("best headphones").await;
        assert!(block.starts_with("[1] A source"));
        assert!(block.contains("Snippet content about headphones"));
    }
}
