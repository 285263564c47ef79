//! Per-claim judge loop.
//!
//! A claim starts in [`JudgeStage::AwaitingDecision`]. Each judge call either
//! ends the loop with a verdict or asks for one research round, which consumes
//! one unit of the round budget and returns the claim to `AwaitingDecision`.
//! Asking for research with no budget left ends the loop as `UNSUPPORTED`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::events::EventCollector;
use crate::judge::{ClaimJudge, JudgeDecision, JudgeRequest};
use crate::metrics;
use crate::model::{
    Claim, ClaimReport, EvidenceItem, RoundStatus, SearchRound, TerminationReason, Verdict,
};
use crate::research::{ResearchAgent, RoundOutput};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeStage {
    AwaitingDecision,
    NeedsResearch(String),
    Terminal {
        verdict: Verdict,
        reason: TerminationReason,
    },
}

/// Mutable state of one claim's verification. Only the judge loop touches it.
#[derive(Debug, Clone)]
pub struct ClaimJudgeState {
    claim: Claim,
    evidence: Vec<EvidenceItem>,
    rounds: Vec<SearchRound>,
    search_history: Vec<String>,
    round_budget: usize,
    stage: JudgeStage,
}

impl ClaimJudgeState {
    pub fn new(claim: Claim, round_budget: usize) -> Self {
        Self {
            claim,
            evidence: Vec::new(),
            rounds: Vec::new(),
            search_history: Vec::new(),
            round_budget,
            stage: JudgeStage::AwaitingDecision,
        }
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn stage(&self) -> &JudgeStage {
        &self.stage
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn rounds_used(&self) -> usize {
        self.rounds.len()
    }

    pub fn rounds_remaining(&self) -> usize {
        self.round_budget.saturating_sub(self.rounds_used())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, JudgeStage::Terminal { .. })
    }

    pub fn request(&self) -> JudgeRequest<'_> {
        JudgeRequest {
            claim: &self.claim,
            evidence: &self.evidence,
            search_history: &self.search_history,
            rounds_remaining: self.rounds_remaining(),
        }
    }

    /// URLs whose visit reached an outcome in earlier rounds.
    pub fn visited_urls(&self) -> Vec<String> {
        self.rounds
            .iter()
            .flat_map(|round| round.visits.iter())
            .filter(|visit| visit.status.settled())
            .map(|visit| visit.url.clone())
            .collect()
    }

    /// Whether `query` was already researched for this claim, ignoring case and spacing.
    pub fn already_searched(&self, query: &str) -> bool {
        let wanted = normalise_query(query);
        self.search_history
            .iter()
            .any(|previous| normalise_query(previous) == wanted)
    }

    /// Transition out of `AwaitingDecision` on a judge decision.
    pub fn apply_decision(&mut self, decision: JudgeDecision) {
        self.stage = match decision {
            JudgeDecision::Verdict(verdict) => JudgeStage::Terminal {
                verdict,
                reason: TerminationReason::Decided,
            },
            JudgeDecision::Research(_) if self.rounds_remaining() == 0 => JudgeStage::Terminal {
                verdict: Verdict::Unsupported,
                reason: TerminationReason::BudgetExhausted,
            },
            JudgeDecision::Research(query) => JudgeStage::NeedsResearch(query),
        };
    }

    /// Append a finished round and return to `AwaitingDecision`.
    pub fn record_round(&mut self, output: RoundOutput) {
        self.search_history.push(output.round.query.clone());
        self.evidence.extend(output.evidence);
        self.rounds.push(output.round);
        if !self.is_terminal() {
            self.stage = JudgeStage::AwaitingDecision;
        }
    }

    /// Force an `UNSUPPORTED` terminal state.
    pub fn abandon(&mut self, reason: TerminationReason) {
        self.stage = JudgeStage::Terminal {
            verdict: Verdict::Unsupported,
            reason,
        };
    }

    pub fn into_report(self) -> ClaimReport {
        let (verdict, reason) = match self.stage {
            JudgeStage::Terminal { verdict, reason } => (verdict, reason),
            // Reports are only built from finished loops; anything else is unresolved.
            _ => (Verdict::Unsupported, TerminationReason::Aborted),
        };
        ClaimReport {
            claim: self.claim,
            verdict,
            reason,
            rounds_used: self.rounds.len(),
            evidence: self.evidence,
            rounds: self.rounds,
        }
    }
}

fn normalise_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs the judge loop for single claims. Cheap to clone into claim workers.
#[derive(Clone)]
pub struct ClaimVerifier {
    judge: Arc<dyn ClaimJudge>,
    research: ResearchAgent,
    round_budget: usize,
    judge_retry: RetryPolicy,
    events: Option<EventCollector>,
}

impl ClaimVerifier {
    pub fn new(judge: Arc<dyn ClaimJudge>, research: ResearchAgent) -> Self {
        Self {
            judge,
            research,
            round_budget: 3,
            judge_retry: RetryPolicy::no_retry(Duration::from_secs(20)),
            events: None,
        }
    }

    pub fn configured(mut self, config: &Config) -> Self {
        self.round_budget = config.verification.round_budget;
        self.judge_retry = RetryPolicy::new(
            config.verification.judge_retries,
            &config.retry,
            config.timeouts.call_timeout(),
        );
        self.research = self.research.configured(config);
        self
    }

    pub fn with_round_budget(mut self, round_budget: usize) -> Self {
        self.round_budget = round_budget.max(1);
        self
    }

    pub fn with_judge_retry(mut self, policy: RetryPolicy) -> Self {
        self.judge_retry = policy;
        self
    }

    pub fn with_events(mut self, events: EventCollector) -> Self {
        self.events = Some(events);
        self
    }

    pub fn round_budget(&self) -> usize {
        self.round_budget
    }

    /// Verify one claim to a terminal verdict. Never fails: every trouble
    /// along the way degrades to `UNSUPPORTED` with a termination reason.
    #[instrument(name = "claim.verify", skip_all, fields(claim = %claim, budget = self.round_budget))]
    pub async fn verify(&self, claim: Claim, cancel: &CancelSignal) -> ClaimReport {
        let started = Instant::now();
        if let Some(events) = &self.events {
            events.emit_claim_started(&claim, self.round_budget);
        }

        let mut state = ClaimJudgeState::new(claim, self.round_budget);
        while !state.is_terminal() {
            if cancel.is_cancelled() {
                state.abandon(TerminationReason::Cancelled);
                break;
            }

            match state.stage().clone() {
                JudgeStage::AwaitingDecision => self.decide(&mut state, cancel).await,
                JudgeStage::NeedsResearch(query) => self.research(&mut state, query, cancel).await,
                JudgeStage::Terminal { .. } => break,
            }
        }

        let report = state.into_report();
        let duration_ms = started.elapsed().as_millis() as u64;
        metrics::record_claim(report.verdict.as_str(), report.reason.as_str(), duration_ms);
        if let Some(events) = &self.events {
            events.emit_claim_finished(
                &report.claim,
                report.verdict,
                report.reason,
                report.rounds_used,
                duration_ms,
            );
        }
        info!(
            verdict = %report.verdict,
            reason = report.reason.as_str(),
            rounds = report.rounds_used,
            evidence = report.evidence.len(),
            "claim verified"
        );
        report
    }

    async fn decide(&self, state: &mut ClaimJudgeState, cancel: &CancelSignal) {
        let decision = {
            let request = state.request();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                decision = self.judge_retry.run("claim_judge", || self.judge.decide(request)) => Some(decision),
            }
        };

        match decision {
            None => state.abandon(TerminationReason::Cancelled),
            Some(Ok(decision)) => {
                debug!(?decision, rounds_used = state.rounds_used(), "judge decided");
                if let Some(events) = &self.events {
                    events.emit_decision(state.claim(), state.rounds_used(), &decision);
                }
                state.apply_decision(decision);
                if let JudgeStage::Terminal {
                    reason: TerminationReason::BudgetExhausted,
                    ..
                } = state.stage()
                {
                    info!("round budget exhausted without a verdict");
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "judge failed after retries; claim is unsupported");
                state.abandon(TerminationReason::JudgeFailed);
            }
        }
    }

    async fn research(&self, state: &mut ClaimJudgeState, query: String, cancel: &CancelSignal) {
        let round = state.rounds_used() + 1;
        let output = if state.already_searched(&query) {
            warn!(%query, "judge repeated an earlier query; spending the round without searching");
            RoundOutput {
                round: SearchRound {
                    round,
                    query,
                    results: Vec::new(),
                    selected: Vec::new(),
                    visits: Vec::new(),
                    status: RoundStatus::DuplicateQuery,
                    evidence_added: 0,
                },
                evidence: Vec::new(),
            }
        } else {
            let visited = state.visited_urls();
            self.research
                .run_round(round, state.claim(), &query, &visited, cancel)
                .await
        };

        if let Some(events) = &self.events {
            events.emit_round(state.claim(), &output.round);
        }
        let cancelled = output.round.status == RoundStatus::Cancelled;
        state.record_round(output);
        if cancelled {
            state.abandon(TerminationReason::Cancelled);
        }
    }
}
