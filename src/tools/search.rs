//! DuckDuckGo web search tool
//!
//! Queries the DuckDuckGo HTML endpoint and hands the result snippets back
//! to the agent as one block of text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::SearchSettings;
use crate::error::{Error, Result};
use crate::version;

use super::Tool;

const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

/// Web search backed by DuckDuckGo
pub struct DuckDuckGoSearch {
    settings: SearchSettings,
    client: Client,
}

impl DuckDuckGoSearch {
    pub fn new(settings: SearchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(version::build_info().user_agent())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    fn query_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.settings.base_url,
            &[("q", query), ("kl", self.settings.region.as_str())],
        )
        .map_err(|e| Error::Config(format!("Invalid search URL: {}", e)))
    }

    /// Search and return up to `max_results` snippets
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let url = self.query_url(query)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::from_http(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::tool_failed(
                "search",
                format!("search engine returned status {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::tool_failed("search", e.to_string()))?;

        let snippets = extract_snippets(&body, self.settings.max_results)?;
        debug!(query = %query, results = snippets.len(), "Search completed");
        Ok(snippets)
    }
}

/// Pull the result snippets out of a DuckDuckGo HTML results page
fn extract_snippets(html: &str, max_results: usize) -> Result<Vec<String>> {
    let selector = Selector::parse(".result__snippet")
        .map_err(|e| Error::Internal(format!("Invalid snippet selector: {:?}", e)))?;

    let document = Html::parse_document(html);
    let snippets = document
        .select(&selector)
        .map(|el| {
            el.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
        .take(max_results)
        .collect();

    Ok(snippets)
}

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions \
         about current events, insurance products, premiums or regulations. \
         Input should be a search query."
    }

    async fn run(&self, input: &str) -> Result<String> {
        let query = input.trim().trim_matches('"');
        if query.is_empty() {
            return Err(Error::tool_failed("search", "the search query is empty"));
        }

        // Connection failures are observations for the agent
        let snippets = self.search(query).await.map_err(|e| {
            if e.aborts_run() {
                Error::tool_failed("search", e.to_string())
            } else {
                e
            }
        })?;
        if snippets.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }
        Ok(snippets.join(" "))
    }
}
