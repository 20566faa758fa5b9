//! Web search through DuckDuckGo's HTML results page. No API key required.

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::config::WebSearchConfig;
use crate::models::SearchResult;

const SEARCH_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Search the web. Failures are logged and produce no results.
pub async fn search(
    client: &reqwest::Client,
    config: &WebSearchConfig,
    query: &str,
) -> Vec<SearchResult> {
    if !config.enabled || query.trim().is_empty() {
        return Vec::new();
    }

    match fetch_results(client, config, query).await {
        Ok(results) => {
            tracing::debug!("Web search for {query:?} returned {} results", results.len());
            results
        }
        Err(e) => {
            tracing::warn!("Web search for {query:?} failed: {e:#}");
            Vec::new()
        }
    }
}

async fn fetch_results(
    client: &reqwest::Client,
    config: &WebSearchConfig,
    query: &str,
) -> Result<Vec<SearchResult>> {
    let url = format!("{}/html/", config.base_url);
    let resp = client
        .get(&url)
        .query(&[("q", query)])
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
        .send()
        .await
        .context("Failed to call DuckDuckGo")?;

    if !resp.status().is_success() {
        anyhow::bail!("DuckDuckGo returned {}", resp.status());
    }

    let html = resp
        .text()
        .await
        .context("Failed to read DuckDuckGo response")?;
    parse_results(&html, config.max_results)
}

/// Extract results from a DuckDuckGo HTML page.
pub fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let result_sel = selector(".result")?;
    let link_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for block in document.select(&result_sel) {
        if results.len() >= max_results {
            break;
        }

        let Some(link) = block.select(&link_sel).next() else {
            continue;
        };
        let title = element_text(link);
        let url = link
            .value()
            .attr("href")
            .map(resolve_redirect)
            .unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let snippet = block
            .select(&snippet_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        results.push(SearchResult {
            title,
            url,
            snippet,
        });
    }

    Ok(results)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid selector {css}: {e:?}"))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// DuckDuckGo wraps result links as `//duckduckgo.com/l/?uddg=<encoded>&...`.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    match reqwest::Url::parse(&absolute) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        Err(_) => String::new(),
    }
}
