//! Firecrawl page scraper.

use std::time::Duration;

use async_trait::async_trait;
use factcheck_core::{
    FactCheckError, FetchError, FetchedPage, FetcherConfig, PageFetcher, SecretValue, clean_url,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

#[derive(Clone)]
pub struct FirecrawlFetcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretValue,
}

impl FirecrawlFetcher {
    pub fn new(
        config: &FetcherConfig,
        api_key: SecretValue,
        timeout: Duration,
    ) -> Result<Self, FactCheckError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FactCheckError::InvalidConfiguration(format!("fetch client: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<ScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
struct ScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
}

fn into_page(url: &str, response: ScrapeResponse) -> Result<FetchedPage, FetchError> {
    if !response.success {
        let reason = response
            .error
            .unwrap_or_else(|| "scrape unsuccessful".to_string());
        return Err(FetchError::Transport(reason));
    }
    let data = response
        .data
        .ok_or_else(|| FetchError::Transport("scrape returned no data".into()))?;
    let mut page = FetchedPage::new(url, data.markdown.unwrap_or_default());
    page.title = data.metadata.and_then(|meta| meta.title);
    Ok(page)
}

#[async_trait]
impl PageFetcher for FirecrawlFetcher {
    #[instrument(name = "provider.fetch", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let url = clean_url(url);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&json!({"url": url, "formats": ["markdown"]}))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: ScrapeResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Transport(format!("invalid response: {err}")))?;
        into_page(&url, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_and_title_are_extracted() {
        let response: ScrapeResponse = serde_json::from_value(json!({
            "success": true,
            "data": {
                "markdown": "# Eiffel Tower\nCompleted in 1889.",
                "metadata": {"title": "Eiffel Tower", "statusCode": 200}
            }
        }))
        .unwrap();
        let page = into_page("https://en.wikipedia.org/wiki/Eiffel_Tower", response).unwrap();
        assert_eq!(page.title.as_deref(), Some("Eiffel Tower"));
        assert!(page.text.contains("Completed in 1889."));
    }

    #[test]
    fn unsuccessful_scrape_is_a_fetch_failure() {
        let response: ScrapeResponse =
            serde_json::from_value(json!({"success": false, "error": "blocked by robots"})).unwrap();
        assert_eq!(
            into_page("https://x.example", response).unwrap_err(),
            FetchError::Transport("blocked by robots".into())
        );
    }
}
