use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use factcheck_core::{
    Claim, PageSelector, ReasoningError, SearchHit, decode_selection, extract_json,
};
use tracing::{debug, instrument};

use crate::llm::{ReasoningClient, ReasoningRequest};
use crate::prompts::{SELECTOR_SYSTEM, selector_user};

/// Page selector backed by a reasoning model. URLs the model invents or
/// repeats are dropped; the answer is cut to `max_pages`.
#[derive(Clone)]
pub struct LlmPageSelector {
    client: Arc<dyn ReasoningClient>,
}

impl LlmPageSelector {
    pub fn new(client: Arc<dyn ReasoningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSelector for LlmPageSelector {
    #[instrument(name = "agent.selector", skip_all, fields(results = results.len()))]
    async fn select(
        &self,
        claim: &Claim,
        results: &[SearchHit],
        visited: &[String],
        max_pages: usize,
    ) -> Result<Vec<String>, ReasoningError> {
        if results.is_empty() || max_pages == 0 {
            return Ok(Vec::new());
        }

        let prompt = ReasoningRequest::new(
            SELECTOR_SYSTEM,
            selector_user(claim, results, visited, max_pages),
        );
        let raw = self.client.complete(&prompt).await?;
        let proposed = decode_selection(&extract_json(&raw)?)?;

        let known: HashSet<&str> = results.iter().map(|hit| hit.url.as_str()).collect();
        let visited: HashSet<&str> = visited.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let selected: Vec<String> = proposed
            .into_iter()
            .filter(|url| {
                let keep = known.contains(url.as_str());
                if !keep {
                    debug!(%url, "selector proposed a URL outside the results; dropping");
                }
                keep
            })
            .filter(|url| !visited.contains(url.as_str()))
            .filter(|url| seen.insert(url.clone()))
            .take(max_pages)
            .collect();
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedClient;

    fn hit(rank: usize, url: &str) -> SearchHit {
        SearchHit {
            rank,
            url: url.into(),
            title: format!("title {rank}"),
            snippet: String::new(),
        }
    }

    #[tokio::test]
    async fn keeps_only_known_unvisited_urls() {
        let client = Arc::new(ScriptedClient::new([r#"{
            "selected_urls": [
                "https://made-up.example/",
                "<https://b.example/>",
                "https://a.example/",
                "https://c.example/",
                "https://d.example/"
            ]
        }"#]));
        let selector = LlmPageSelector::new(client);
        let results = vec![
            hit(1, "https://a.example/"),
            hit(2, "https://b.example/"),
            hit(3, "https://c.example/"),
            hit(4, "https://d.example/"),
        ];
        let visited = vec!["https://a.example/".to_string()];

        let selected = selector
            .select(&Claim::new("x"), &results, &visited, 2)
            .await
            .unwrap();
        assert_eq!(selected, vec!["https://b.example/", "https://c.example/"]);
    }

    #[tokio::test]
    async fn no_results_skips_the_call() {
        let client = Arc::new(ScriptedClient::new(Vec::<&str>::new()));
        let selector = LlmPageSelector::new(client.clone());
        let selected = selector.select(&Claim::new("x"), &[], &[], 3).await.unwrap();
        assert!(selected.is_empty());
        assert!(client.prompts().is_empty());
    }
}
