//! Website text extraction for brand context.
//!
//! Fetches the brand's main page, discovers business-relevant same-host
//! subpages, strips page chrome, and returns collapsed plain text. Failures
//! never propagate past this crate: a failed main fetch degrades to an
//! `"ERROR"`-prefixed sentinel string, and subpage failures are skipped.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use brandlens_shared::{BrandLensError, ERROR_SENTINEL, Result};

/// User-Agent string for scrape requests.
const USER_AGENT: &str = concat!("BrandLens/", env!("CARGO_PKG_VERSION"));

/// URL substrings marking a subpage as business-relevant.
const RELEVANT_KEYWORDS: [&str; 15] = [
    "product",
    "products",
    "solutions",
    "services",
    "categories",
    "catalog",
    "our-business",
    "therapy",
    "therapeutic",
    "portfolio",
    "brands",
    "what-we-do",
    "pipeline",
    "research",
    "overview",
];

/// Tags whose subtrees carry no readable brand context.
const SKIP_TAGS: [&str; 7] = [
    "script", "style", "noscript", "footer", "header", "nav", "form",
];

/// Cap on fetched subpages per site.
const MAX_SUBPAGES: usize = 5;

// ---------------------------------------------------------------------------
// SiteExtractor
// ---------------------------------------------------------------------------

/// Fetches and extracts readable text from a brand's website.
pub struct SiteExtractor {
    client: Client,
}

impl SiteExtractor {
    /// Create a new extractor with a bounded-timeout HTTP client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                BrandLensError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Extract readable text for the site at `url`.
    ///
    /// Returns the combined text of the main page plus up to
    /// [`MAX_SUBPAGES`] relevant subpages, or an `"ERROR"`-prefixed sentinel
    /// when the main page cannot be fetched. Never errors.
    #[instrument(skip(self))]
    pub async fn extract_site_text(&self, url: &str) -> String {
        let base = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return format!("{ERROR_SENTINEL}: invalid URL '{url}': {e}"),
        };

        let Some(main_html) = self.fetch_html(&base).await else {
            return format!("{ERROR_SENTINEL}: unable to fetch {url}");
        };

        let mut chunks = vec![clean_text(&main_html)];

        let links = discover_relevant_links(&base, &main_html);
        for link in links.into_iter().take(MAX_SUBPAGES) {
            match self.fetch_html(&link).await {
                Some(html) => chunks.push(clean_text(&html)),
                None => warn!(%link, "subpage fetch failed, skipping"),
            }
        }

        collapse_whitespace(&chunks.join(" "))
    }

    /// Fetch a page body, or `None` on any network/HTTP failure.
    async fn fetch_html(&self, url: &Url) -> Option<String> {
        let response = match self.client.get(url.as_str()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%url, error = %e, "fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(%url, status = %response.status(), "non-success status");
            return None;
        }

        response.text().await.ok()
    }
}

// ---------------------------------------------------------------------------
// Text extraction
// ---------------------------------------------------------------------------

/// Extract readable text from an HTML document, skipping page chrome.
pub fn clean_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    collect_text(doc.tree.root(), &mut out);
    collapse_whitespace(&out)
}

fn collect_text(node: ego_tree::NodeRef<'_, scraper::Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            scraper::Node::Element(el) => {
                if SKIP_TAGS.contains(&el.name()) {
                    continue;
                }
                collect_text(child, out);
            }
            scraper::Node::Text(text) => {
                out.push(' ');
                out.push_str(&text);
            }
            _ => {}
        }
    }
}

/// Collapse all whitespace runs into single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Subpage discovery
// ---------------------------------------------------------------------------

/// Find same-host links whose URL mentions a business-relevant keyword.
///
/// Order follows first appearance in the document; duplicates are dropped.
pub fn discover_relevant_links(base: &Url, html: &str) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("anchor selector");

    let mut links: Vec<Url> = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);

        // Internal pages only
        if resolved.host_str() != base.host_str() {
            continue;
        }

        let lowered = resolved.as_str().to_lowercase();
        if !RELEVANT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            continue;
        }

        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_chrome_tags() {
        let html = r#"<html><head><script>var x = 1;</script><style>.a{}</style></head>
            <body>
              <nav>Home About</nav>
              <main><h1>Acme Audio</h1><p>Wireless   headphones and
              earbuds.</p></main>
              <footer>© Acme</footer>
            </body></html>"#;

        let text = clean_text(html);
        assert!(text.contains("Acme Audio"));
        assert!(text.contains("Wireless headphones and earbuds."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("Home About"));
        assert!(!text.contains("© Acme"));
    }

    #[test]
    fn clean_text_is_total_on_garbage() {
        assert_eq!(clean_text(""), "");
        let text = clean_text("<div><p>unclosed");
        assert_eq!(text, "unclosed");
    }

    #[test]
    fn discover_links_filters_by_host_and_keyword() {
        let base = Url::parse("https://acme.example/").unwrap();
        let html = r#"<body>
            <a href="/products/headphones">Headphones</a>
            <a href="/about-us">About</a>
            <a href="https://other.example/products">Elsewhere</a>
            <a href="/products/headphones#reviews">Dup with fragment</a>
            <a href="/support/overview">Support overview</a>
        </body>"#;

        let links = discover_relevant_links(&base, html);
        let as_strings: Vec<String> = links.iter().map(|u| u.to_string()).collect();

        assert_eq!(
            as_strings,
            vec![
                "https://acme.example/products/headphones",
                "https://acme.example/support/overview",
            ]
        );
    }

    #[tokio::test]
    async fn extract_combines_main_and_relevant_subpages() {
        let server = wiremock::MockServer::start().await;

        let main_page = r#"<html><body><main>
            <h1>Acme Audio</h1>
            <a href="/products">Our products</a>
            <a href="/careers">Careers</a>
        </main></body></html>"#;

        let products_page = r#"<html><body><main>
            <p>Acme Pulse 3 noise cancelling headphones</p>
        </main></body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(main_page))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/products"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(products_page))
            .mount(&server)
            .await;

        let extractor = SiteExtractor::new().unwrap();
        let text = extractor.extract_site_text(&server.uri()).await;

        assert!(text.contains("Acme Audio"));
        assert!(text.contains("Acme Pulse 3"));
    }

    #[tokio::test]
    async fn extract_degrades_to_sentinel_on_fetch_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let extractor = SiteExtractor::new().unwrap();
        let text = extractor.extract_site_text(&server.uri()).await;

        assert!(text.starts_with(ERROR_SENTINEL));
        assert!(brandlens_shared::is_no_content(&text));
    }

    #[tokio::test]
    async fn extract_survives_broken_subpage() {
        let server = wiremock::MockServer::start().await;

        let main_page = r#"<html><body>
            <p>Main content here</p>
            <a href="/catalog">Catalog</a>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(main_page))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/catalog"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = SiteExtractor::new().unwrap();
        let text = extractor.extract_site_text(&server.uri()).await;

        assert!(text.contains("Main content here"));
        assert!(!text.starts_with(ERROR_SENTINEL));
    }
}
