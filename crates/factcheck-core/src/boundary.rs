//! Interfaces to collaborators that live outside the verification core.

use async_trait::async_trait;

use crate::error::{FetchError, ReasoningError, SearchError};
use crate::model::SearchHit;

/// Web search. An empty `Ok` means "zero results", distinct from provider failure.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Page text retrieval.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            text: text.into(),
        }
    }

    /// Cap page text at `max_chars` characters, marking the cut.
    pub fn truncated(mut self, max_chars: usize) -> Self {
        if let Some((byte_idx, _)) = self.text.char_indices().nth(max_chars) {
            self.text.truncate(byte_idx);
            self.text.push_str("\n\n[Content truncated...]");
        }
        self
    }
}

/// Statement to ordered claims.
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    async fn extract(&self, statement: &str) -> Result<Vec<String>, ReasoningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_marks_cut_on_char_boundary() {
        let page = FetchedPage::new("u", "héllo wörld").truncated(5);
        assert!(page.text.starts_with("héllo"));
        assert!(page.text.ends_with("[Content truncated...]"));

        let short = FetchedPage::new("u", "short").truncated(10);
        assert_eq!(short.text, "short");
    }
}
