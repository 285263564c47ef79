#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use factcheck_core::{
    AuthorityPageSelector, Claim, ClaimExtractor, ClaimJudge, ClaimVerifier, EvidenceSummarizer,
    FactChecker, FetchError, FetchedPage, JudgeDecision, JudgeRequest, PageFetcher, PageSelector,
    ReasoningError, ResearchAgent, SearchError, SearchHit, SearchProvider, Stance, SummaryOutcome,
    Verdict,
};

/// Search backed by a fixed query → results table. Unknown queries return nothing.
#[derive(Default)]
pub struct TableSearch {
    results: HashMap<String, Vec<SearchHit>>,
    failing: bool,
    pub queries: Mutex<Vec<String>>,
}

impl TableSearch {
    pub fn with(mut self, query: &str, hits: &[(&str, &str, &str)]) -> Self {
        let hits = hits
            .iter()
            .enumerate()
            .map(|(idx, (url, title, snippet))| SearchHit {
                rank: idx + 1,
                url: url.to_string(),
                title: title.to_string(),
                snippet: snippet.to_string(),
            })
            .collect();
        self.results.insert(query.to_string(), hits);
        self
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for TableSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing {
            return Err(SearchError::RateLimited);
        }
        let mut hits = self.results.get(query).cloned().unwrap_or_default();
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Pages keyed by URL. Page text `supports: ...`, `refutes: ...` or
/// `neutral: ...` drives [`StanceSummarizer`]; anything else is irrelevant.
#[derive(Default)]
pub struct PageTable {
    pages: HashMap<String, Result<String, FetchError>>,
    delay: Option<Duration>,
    pub fetched: Mutex<Vec<String>>,
}

impl PageTable {
    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(text.to_string()));
        self
    }

    pub fn broken(mut self, url: &str, err: FetchError) -> Self {
        self.pages.insert(url.to_string(), Err(err));
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for PageTable {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.pages.get(url) {
            Some(Ok(text)) => Ok(FetchedPage::new(url, text.clone())),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::Status(404)),
        }
    }
}

pub struct StanceSummarizer;

#[async_trait]
impl EvidenceSummarizer for StanceSummarizer {
    async fn summarize(
        &self,
        _claim: &Claim,
        _url: &str,
        page_text: &str,
    ) -> Result<SummaryOutcome, ReasoningError> {
        let Some((label, rest)) = page_text.split_once(':') else {
            return Ok(SummaryOutcome::NoRelevantContent);
        };
        let stance = match label.trim() {
            "supports" => Stance::Supports,
            "refutes" => Stance::Refutes,
            "neutral" => Stance::NeutralOrUnclear,
            _ => return Ok(SummaryOutcome::NoRelevantContent),
        };
        Ok(SummaryOutcome::Relevant {
            summary: rest.trim().to_string(),
            stance,
        })
    }
}

/// Proposes every result URL regardless of the cap.
pub struct GreedySelector;

#[async_trait]
impl PageSelector for GreedySelector {
    async fn select(
        &self,
        _claim: &Claim,
        results: &[SearchHit],
        _visited: &[String],
        _max_pages: usize,
    ) -> Result<Vec<String>, ReasoningError> {
        Ok(results.iter().map(|hit| hit.url.clone()).collect())
    }
}

/// Decides on evidence: any refuting item → REFUTED, any supporting item →
/// SUPPORTED, otherwise research `"<claim> round N"`.
#[derive(Default)]
pub struct EvidenceJudge {
    pub calls: AtomicUsize,
}

impl EvidenceJudge {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimJudge for EvidenceJudge {
    async fn decide(&self, request: JudgeRequest<'_>) -> Result<JudgeDecision, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.evidence.iter().any(|e| e.stance == Stance::Refutes) {
            return Ok(JudgeDecision::Verdict(Verdict::Refuted));
        }
        if request.evidence.iter().any(|e| e.stance == Stance::Supports) {
            return Ok(JudgeDecision::Verdict(Verdict::Supported));
        }
        Ok(JudgeDecision::Research(format!(
            "{} round {}",
            request.claim,
            request.search_history.len() + 1
        )))
    }
}

/// Splits statements on " and " / ". "; fails on statements containing "???".
pub struct SplitExtractor;

#[async_trait]
impl ClaimExtractor for SplitExtractor {
    async fn extract(&self, statement: &str) -> Result<Vec<String>, ReasoningError> {
        if statement.contains("???") {
            return Err(ReasoningError::request("extractor unavailable", false));
        }
        Ok(statement
            .split(" and ")
            .flat_map(|part| part.split(". "))
            .map(|part| part.trim().trim_end_matches('.').to_string())
            .filter(|part| !part.is_empty())
            .collect())
    }
}

pub fn research_agent(
    search: Arc<TableSearch>,
    pages: Arc<PageTable>,
    selector: Arc<dyn PageSelector>,
) -> ResearchAgent {
    ResearchAgent::new(search, selector, pages, Arc::new(StanceSummarizer))
}

pub fn checker(
    search: Arc<TableSearch>,
    pages: Arc<PageTable>,
    judge: Arc<EvidenceJudge>,
    round_budget: usize,
) -> FactChecker {
    let agent = research_agent(search, pages, Arc::new(AuthorityPageSelector::new()));
    let verifier = ClaimVerifier::new(judge, agent).with_round_budget(round_budget);
    FactChecker::new(Arc::new(SplitExtractor), verifier)
}
