//! Scripted collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::boundary::{FetchedPage, PageFetcher, SearchProvider};
use crate::error::{FetchError, ReasoningError, SearchError};
use crate::judge::{ClaimJudge, JudgeDecision, JudgeRequest};
use crate::model::{Claim, SearchHit, Stance};
use crate::selector::PageSelector;
use crate::summarizer::{EvidenceSummarizer, SummaryOutcome};

pub fn hits(urls: &[String]) -> Vec<SearchHit> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| SearchHit {
            rank: i + 1,
            url: url.clone(),
            title: format!("result {}", i + 1),
            snippet: String::new(),
        })
        .collect()
}

pub struct StaticSearch {
    result: Result<Vec<SearchHit>, SearchError>,
    pub calls: AtomicUsize,
}

impl StaticSearch {
    pub fn ok(results: Vec<SearchHit>) -> Self {
        Self {
            result: Ok(results),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(err: SearchError) -> Self {
        Self {
            result: Err(err),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Serves `default` for every URL unless overridden per URL.
pub struct ScriptedFetcher {
    default: String,
    pages: HashMap<String, String>,
    failures: HashMap<String, FetchError>,
    panics: HashSet<String>,
    delay: Option<Duration>,
    slow: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn uniform(text: &str) -> Self {
        Self {
            default: text.to_string(),
            pages: HashMap::new(),
            failures: HashMap::new(),
            panics: HashSet::new(),
            delay: None,
            slow: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn fail(mut self, url: &str, err: FetchError) -> Self {
        self.failures.insert(url.to_string(), err);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only `url`, overriding the uniform delay.
    pub fn slow(mut self, url: &str, delay: Duration) -> Self {
        self.slow.insert(url.to_string(), delay);
        self
    }

    pub fn panic_on(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.slow.get(url).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        if self.panics.contains(url) {
            panic!("scripted fetcher panic for {url}");
        }
        if let Some(err) = self.failures.get(url) {
            return Err(err.clone());
        }
        let text = self.pages.get(url).unwrap_or(&self.default);
        Ok(FetchedPage::new(url, text.clone()))
    }
}

/// Reads the stance from a `supports:`, `refutes:` or `neutral:` prefix.
pub struct PrefixSummarizer;

#[async_trait]
impl EvidenceSummarizer for PrefixSummarizer {
    async fn summarize(
        &self,
        _claim: &Claim,
        _url: &str,
        page_text: &str,
    ) -> Result<SummaryOutcome, ReasoningError> {
        let (label, rest) = page_text.split_once(':').unwrap_or(("", page_text));
        let stance = match label.trim() {
            "supports" => Stance::Supports,
            "refutes" => Stance::Refutes,
            "neutral" => Stance::NeutralOrUnclear,
            "garbage" => return Err(ReasoningError::Malformed("scripted".into())),
            _ => return Ok(SummaryOutcome::NoRelevantContent),
        };
        Ok(SummaryOutcome::Relevant {
            summary: rest.trim().to_string(),
            stance,
        })
    }
}

/// [`PrefixSummarizer`] that takes `delay` per page once `fast_calls` pages
/// have been answered immediately.
pub struct SlowSummarizer {
    delay: Duration,
    fast_calls: usize,
    calls: AtomicUsize,
}

impl SlowSummarizer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fast_calls: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn after(mut self, fast_calls: usize) -> Self {
        self.fast_calls = fast_calls;
        self
    }
}

#[async_trait]
impl EvidenceSummarizer for SlowSummarizer {
    async fn summarize(
        &self,
        claim: &Claim,
        url: &str,
        page_text: &str,
    ) -> Result<SummaryOutcome, ReasoningError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.fast_calls {
            tokio::time::sleep(self.delay).await;
        }
        PrefixSummarizer.summarize(claim, url, page_text).await
    }
}

/// Always proposes the same URLs, ignoring the cap.
pub struct FixedSelector(pub Vec<String>);

#[async_trait]
impl PageSelector for FixedSelector {
    async fn select(
        &self,
        _claim: &Claim,
        _results: &[SearchHit],
        _visited: &[String],
        _max_pages: usize,
    ) -> Result<Vec<String>, ReasoningError> {
        Ok(self.0.clone())
    }
}

pub struct FailingSelector;

#[async_trait]
impl PageSelector for FailingSelector {
    async fn select(
        &self,
        _claim: &Claim,
        _results: &[SearchHit],
        _visited: &[String],
        _max_pages: usize,
    ) -> Result<Vec<String>, ReasoningError> {
        Err(ReasoningError::request("selector offline", false))
    }
}

/// Judge driven by a closure over the request, counting its calls.
pub struct FnJudge<F> {
    decide: F,
    pub calls: AtomicUsize,
}

impl<F> FnJudge<F>
where
    F: Fn(&JudgeRequest<'_>) -> Result<JudgeDecision, ReasoningError> + Send + Sync,
{
    pub fn new(decide: F) -> Self {
        Self {
            decide,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> ClaimJudge for FnJudge<F>
where
    F: Fn(&JudgeRequest<'_>) -> Result<JudgeDecision, ReasoningError> + Send + Sync,
{
    async fn decide(&self, request: JudgeRequest<'_>) -> Result<JudgeDecision, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.decide)(&request)
    }
}
