//! Serper (Google Search) provider.

use std::time::Duration;

use async_trait::async_trait;
use factcheck_core::{FactCheckError, SearchConfig, SearchError, SearchHit, SearchProvider, SecretValue};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct SerperSearch {
    client: reqwest::Client,
    endpoint: String,
    country: String,
    api_key: SecretValue,
}

impl SerperSearch {
    pub fn new(
        config: &SearchConfig,
        api_key: SecretValue,
        timeout: Duration,
    ) -> Result<Self, FactCheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FactCheckError::InvalidConfiguration(format!("search client: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            country: config.country.clone(),
            api_key,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Organic results as ranked hits; entries without a link are skipped.
fn into_hits(response: SerperResponse, max_results: usize) -> Vec<SearchHit> {
    response
        .organic
        .into_iter()
        .filter(|item| !item.link.trim().is_empty())
        .take(max_results)
        .enumerate()
        .map(|(idx, item)| SearchHit {
            rank: idx + 1,
            url: item.link.trim().to_string(),
            title: item.title,
            snippet: item.snippet,
        })
        .collect()
}

#[async_trait]
impl SearchProvider for SerperSearch {
    #[instrument(name = "provider.search", skip(self), fields(country = %self.country))]
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", self.api_key.expose())
            .json(&json!({"q": query, "num": max_results, "gl": self.country}))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Provider(err.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = self.api_key.scrub(&body).chars().take(200).collect();
            return Err(SearchError::Provider(format!(
                "HTTP {}: {detail}",
                status.as_u16()
            )));
        }

        let payload: SerperResponse = response
            .json()
            .await
            .map_err(|err| SearchError::Provider(format!("invalid response: {err}")))?;
        let hits = into_hits(payload, max_results);
        debug!(hits = hits.len(), "search answered");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_results_become_ranked_hits() {
        let payload: SerperResponse = serde_json::from_value(json!({
            "searchParameters": {"q": "eiffel tower"},
            "organic": [
                {"title": "Eiffel Tower - Wikipedia", "link": "https://en.wikipedia.org/wiki/Eiffel_Tower", "snippet": "completed in 1889", "position": 1},
                {"title": "no link"},
                {"title": "Official site", "link": "https://www.toureiffel.paris/en", "position": 3}
            ]
        }))
        .unwrap();

        let hits = into_hits(payload, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
        assert_eq!(hits[1].url, "https://www.toureiffel.paris/en");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn missing_organic_is_zero_results() {
        let payload: SerperResponse = serde_json::from_value(json!({"answerBox": {}})).unwrap();
        assert!(into_hits(payload, 10).is_empty());
    }
}
