//! One bounded evidence-gathering round: search, select, fetch, summarise.
//!
//! A round never issues more than [`MAX_PAGE_VISITS`] fetches and returns
//! within [`ResearchSettings::round_deadline`]. Provider failures, fetch failures and undecodable summaries are
//! recorded on the [`SearchRound`] and degrade to "no evidence"; they never
//! propagate to the claim loop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, info, instrument, warn};

use crate::boundary::{PageFetcher, SearchProvider};
use crate::cancel::CancelSignal;
use crate::config::{Config, MAX_PAGE_VISITS};
use crate::error::{FetchError, SearchError};
use crate::metrics;
use crate::model::{Claim, EvidenceItem, PageVisit, RoundStatus, SearchRound, VisitStatus};
use crate::retry::RetryPolicy;
use crate::selector::PageSelector;
use crate::summarizer::{EvidenceSummarizer, SummaryOutcome};

/// When a round has gathered enough to stop visiting further pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyStopPolicy {
    /// Supporting or refuting items needed in the current round; `0` never stops early.
    pub min_decisive: usize,
}

impl EarlyStopPolicy {
    pub fn disabled() -> Self {
        Self { min_decisive: 0 }
    }

    pub fn is_sufficient(&self, round_evidence: &[EvidenceItem]) -> bool {
        self.min_decisive > 0
            && round_evidence
                .iter()
                .filter(|item| item.stance.is_decisive())
                .count()
                >= self.min_decisive
    }
}

impl Default for EarlyStopPolicy {
    fn default() -> Self {
        Self { min_decisive: 1 }
    }
}

#[derive(Debug, Clone)]
pub struct ResearchSettings {
    pub max_page_visits: usize,
    pub search_results: usize,
    pub max_page_chars: usize,
    pub visit_concurrency: usize,
    pub search_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_page_visits: MAX_PAGE_VISITS,
            search_results: 10,
            max_page_chars: 10_000,
            visit_concurrency: MAX_PAGE_VISITS,
            search_timeout: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

impl ResearchSettings {
    fn visit_cap(&self) -> usize {
        self.max_page_visits.clamp(1, MAX_PAGE_VISITS)
    }

    /// Wall-clock limit for a whole round: one fetch timeout per visit slot.
    pub fn round_deadline(&self) -> Duration {
        self.fetch_timeout * self.visit_cap() as u32
    }
}

/// Evidence gathered by one round together with its audit record.
#[derive(Debug, Clone)]
pub struct RoundOutput {
    pub round: SearchRound,
    /// Discovery order.
    pub evidence: Vec<EvidenceItem>,
}

#[derive(Clone)]
pub struct ResearchAgent {
    search: Arc<dyn SearchProvider>,
    selector: Arc<dyn PageSelector>,
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Arc<dyn EvidenceSummarizer>,
    settings: ResearchSettings,
    early_stop: EarlyStopPolicy,
    selector_retry: RetryPolicy,
    summarizer_retry: RetryPolicy,
}

impl ResearchAgent {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        selector: Arc<dyn PageSelector>,
        fetcher: Arc<dyn PageFetcher>,
        summarizer: Arc<dyn EvidenceSummarizer>,
    ) -> Self {
        let settings = ResearchSettings::default();
        let call_timeout = settings.search_timeout;
        Self {
            search,
            selector,
            fetcher,
            summarizer,
            settings,
            early_stop: EarlyStopPolicy::default(),
            selector_retry: RetryPolicy::no_retry(call_timeout),
            summarizer_retry: RetryPolicy::no_retry(call_timeout),
        }
    }

    /// Apply the `[research]`, `[timeouts]` and `[retry]` sections.
    pub fn configured(mut self, config: &Config) -> Self {
        let call_timeout = config.timeouts.call_timeout();
        self.settings = ResearchSettings {
            max_page_visits: config.research.max_page_visits,
            search_results: config.research.search_results,
            max_page_chars: config.research.max_page_chars,
            visit_concurrency: config.research.visit_concurrency,
            search_timeout: call_timeout,
            fetch_timeout: config.timeouts.fetch_timeout(),
        };
        self.early_stop = EarlyStopPolicy {
            min_decisive: config.research.early_stop_min_decisive,
        };
        self.selector_retry =
            RetryPolicy::new(config.research.selector_retries, &config.retry, call_timeout);
        self.summarizer_retry =
            RetryPolicy::new(config.research.summarizer_retries, &config.retry, call_timeout);
        self
    }

    pub fn with_settings(mut self, settings: ResearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_early_stop(mut self, policy: EarlyStopPolicy) -> Self {
        self.early_stop = policy;
        self
    }

    pub fn with_retry(mut self, selector: RetryPolicy, summarizer: RetryPolicy) -> Self {
        self.selector_retry = selector;
        self.summarizer_retry = summarizer;
        self
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    /// Run one research round for `query`. `visited` holds URLs already read
    /// for this claim in earlier rounds.
    #[instrument(name = "research.round", skip_all, fields(round = round, query = %query))]
    pub async fn run_round(
        &self,
        round: usize,
        claim: &Claim,
        query: &str,
        visited: &[String],
        cancel: &CancelSignal,
    ) -> RoundOutput {
        let mut record = SearchRound {
            round,
            query: query.to_string(),
            results: Vec::new(),
            selected: Vec::new(),
            visits: Vec::new(),
            status: RoundStatus::Completed,
            evidence_added: 0,
        };

        let deadline = Instant::now() + self.settings.round_deadline();
        let search_deadline = deadline.min(Instant::now() + self.settings.search_timeout);
        let search = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = timeout_at(
                search_deadline,
                self.search.search(query, self.settings.search_results),
            ) => Some(result),
        };

        let results = match search {
            None => return finish(record, Vec::new(), RoundStatus::Cancelled),
            Some(Ok(Ok(results))) if results.is_empty() => {
                info!("search returned no results");
                return finish(record, Vec::new(), RoundStatus::NoResults);
            }
            Some(Ok(Ok(results))) => results,
            Some(Ok(Err(err))) => {
                warn!(error = %err, "search failed; round yields no evidence");
                let reason = err.to_string();
                return finish(record, Vec::new(), RoundStatus::SearchFailed { reason });
            }
            Some(Err(_)) => {
                warn!("search timed out; round yields no evidence");
                let reason = SearchError::Timeout.to_string();
                return finish(record, Vec::new(), RoundStatus::SearchFailed { reason });
            }
        };

        let cap = self.settings.visit_cap();
        let selection = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            selection = timeout_at(deadline, self.selector_retry.run("page_selector", || {
                self.selector.select(claim, &results, visited, cap)
            })) => Some(selection),
        };
        record.results = results;

        let proposed = match selection {
            None => return finish(record, Vec::new(), RoundStatus::Cancelled),
            Some(Err(_)) => {
                warn!("page selection ran past the round deadline");
                return finish(record, Vec::new(), RoundStatus::DeadlineExceeded);
            }
            Some(Ok(Ok(urls))) => urls,
            Some(Ok(Err(err))) => {
                warn!(error = %err, "page selection failed; visiting nothing this round");
                Vec::new()
            }
        };
        record.selected = enforce_selection_contract(proposed, visited, cap);
        debug!(selected = ?record.selected, "pages selected");

        let (visits, evidence, status) = self
            .visit_pages(claim, &record.selected, deadline, cancel)
            .await;
        record.visits = visits;
        finish(record, evidence, status)
    }

    async fn visit_pages(
        &self,
        claim: &Claim,
        urls: &[String],
        deadline: Instant,
        cancel: &CancelSignal,
    ) -> (Vec<PageVisit>, Vec<EvidenceItem>, RoundStatus) {
        let concurrency = self.settings.visit_concurrency.clamp(1, MAX_PAGE_VISITS);
        let visitor = PageVisitor {
            fetcher: self.fetcher.clone(),
            summarizer: self.summarizer.clone(),
            retry: self.summarizer_retry.clone(),
            fetch_timeout: self.settings.fetch_timeout,
            max_chars: self.settings.max_page_chars,
        };
        let mut outcomes: Vec<Option<VisitStatus>> = vec![None; urls.len()];
        let mut started = vec![false; urls.len()];
        let mut evidence = Vec::new();
        let mut in_flight = JoinSet::new();
        let mut slots = HashMap::new();
        let mut next = 0;
        let mut status = RoundStatus::Completed;

        loop {
            while next < urls.len() && in_flight.len() < concurrency {
                let task =
                    in_flight.spawn(visitor.clone().visit(next, claim.clone(), urls[next].clone()));
                slots.insert(task.id(), next);
                started[next] = true;
                next += 1;
            }

            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    status = RoundStatus::Cancelled;
                    break;
                }
                _ = sleep_until(deadline) => {
                    warn!(
                        unfinished = in_flight.len(),
                        "round deadline reached; abandoning unfinished visits"
                    );
                    status = RoundStatus::DeadlineExceeded;
                    break;
                }
                joined = in_flight.join_next_with_id() => joined,
            };

            let Some(joined) = joined else { break };
            let (index, outcome, item) = match joined {
                Ok((_, visit)) => visit,
                Err(err) => {
                    let Some(index) = slots.get(&err.id()).copied() else {
                        continue;
                    };
                    warn!(url = %urls[index], error = %err, "page visit task failed");
                    let reason = format!("visit task failed: {err}");
                    (index, VisitStatus::FetchFailed { reason }, None)
                }
            };
            metrics::record_visit(outcome.as_str());
            debug!(url = %urls[index], status = outcome.as_str(), "page visit finished");
            outcomes[index] = Some(outcome);
            evidence.extend(item);

            let remaining = next < urls.len() || !in_flight.is_empty();
            if remaining && self.early_stop.is_sufficient(&evidence) {
                info!(
                    evidence = evidence.len(),
                    "round evidence sufficient; stopping remaining visits"
                );
                status = RoundStatus::EarlyStopped;
                break;
            }
        }
        in_flight.abort_all();

        let visits = urls
            .iter()
            .zip(outcomes)
            .zip(started)
            .map(|((url, outcome), started)| PageVisit {
                url: url.clone(),
                status: outcome.unwrap_or(if started {
                    VisitStatus::Abandoned
                } else {
                    VisitStatus::Skipped
                }),
            })
            .collect();

        (visits, evidence, status)
    }
}

/// Owned handles for one page visit so it can run on its own task.
#[derive(Clone)]
struct PageVisitor {
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Arc<dyn EvidenceSummarizer>,
    retry: RetryPolicy,
    fetch_timeout: Duration,
    max_chars: usize,
}

impl PageVisitor {
    async fn visit(
        self,
        index: usize,
        claim: Claim,
        url: String,
    ) -> (usize, VisitStatus, Option<EvidenceItem>) {
        let page = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&url)).await {
            Ok(Ok(page)) => page.truncated(self.max_chars),
            Ok(Err(err)) => {
                warn!(%url, error = %err, "page fetch failed");
                let reason = err.to_string();
                return (index, VisitStatus::FetchFailed { reason }, None);
            }
            Err(_) => {
                warn!(%url, "page fetch timed out");
                let reason = FetchError::Timeout.to_string();
                return (index, VisitStatus::FetchFailed { reason }, None);
            }
        };

        let summarizer = &self.summarizer;
        let summary = self
            .retry
            .run("evidence_summarizer", || {
                summarizer.summarize(&claim, &url, &page.text)
            })
            .await;

        match summary {
            Ok(SummaryOutcome::Relevant { summary, stance }) => {
                let item = EvidenceItem {
                    source_url: url,
                    summary,
                    stance,
                };
                (index, VisitStatus::Relevant, Some(item))
            }
            Ok(SummaryOutcome::NoRelevantContent) => (index, VisitStatus::NoRelevantContent, None),
            Err(err) => {
                let reason = err.to_string();
                (index, VisitStatus::SummaryFailed { reason }, None)
            }
        }
    }
}

/// Dedupe, drop already-visited URLs, and truncate to the cap.
fn enforce_selection_contract(proposed: Vec<String>, visited: &[String], cap: usize) -> Vec<String> {
    let visited: HashSet<&str> = visited.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut selected: Vec<String> = proposed
        .into_iter()
        .filter(|url| !url.trim().is_empty())
        .filter(|url| !visited.contains(url.as_str()))
        .filter(|url| seen.insert(url.clone()))
        .collect();

    if selected.len() > cap {
        warn!(
            proposed = selected.len(),
            cap, "selector exceeded the page visit cap; truncating"
        );
        selected.truncate(cap);
    }
    selected
}

fn finish(mut record: SearchRound, evidence: Vec<EvidenceItem>, status: RoundStatus) -> RoundOutput {
    metrics::record_round(status.as_str());
    record.status = status;
    record.evidence_added = evidence.len();
    RoundOutput {
        round: record,
        evidence,
    }
}
