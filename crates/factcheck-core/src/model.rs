//! Claims, evidence, rounds and verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single factual assertion extracted from a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claim(String);

impl Claim {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a piece of evidence bears on its claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Supports,
    Refutes,
    NeutralOrUnclear,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Supports => "supports",
            Stance::Refutes => "refutes",
            Stance::NeutralOrUnclear => "neutral_or_unclear",
        }
    }

    pub fn is_decisive(&self) -> bool {
        matches!(self, Stance::Supports | Stance::Refutes)
    }
}

/// One claim-relevant fact extracted from a visited page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub source_url: String,
    pub summary: String,
    pub stance: Stance,
}

/// One ranked result returned by a search provider. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VisitStatus {
    /// Page yielded an evidence item.
    Relevant,
    NoRelevantContent,
    FetchFailed { reason: String },
    SummaryFailed { reason: String },
    /// Fetch was in flight when the round ended.
    Abandoned,
    /// Never attempted because the round ended first.
    Skipped,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Relevant => "relevant",
            VisitStatus::NoRelevantContent => "no_relevant_content",
            VisitStatus::FetchFailed { .. } => "fetch_failed",
            VisitStatus::SummaryFailed { .. } => "summary_failed",
            VisitStatus::Abandoned => "abandoned",
            VisitStatus::Skipped => "skipped",
        }
    }

    /// Whether a fetch was issued for this visit.
    pub fn attempted(&self) -> bool {
        !matches!(self, VisitStatus::Skipped)
    }

    /// Whether the visit ran to an outcome. Abandoned and skipped pages were
    /// never read and may be offered again in a later round.
    pub fn settled(&self) -> bool {
        !matches!(self, VisitStatus::Abandoned | VisitStatus::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageVisit {
    pub url: String,
    #[serde(flatten)]
    pub status: VisitStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundStatus {
    Completed,
    EarlyStopped,
    NoResults,
    SearchFailed { reason: String },
    DuplicateQuery,
    Cancelled,
    /// The round ran out of time; unfinished visits were abandoned.
    DeadlineExceeded,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Completed => "completed",
            RoundStatus::EarlyStopped => "early_stopped",
            RoundStatus::NoResults => "no_results",
            RoundStatus::SearchFailed { .. } => "search_failed",
            RoundStatus::DuplicateQuery => "duplicate_query",
            RoundStatus::Cancelled => "cancelled",
            RoundStatus::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Audit record of one research round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRound {
    /// 1-based position within the claim's loop.
    pub round: usize,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub selected: Vec<String>,
    pub visits: Vec<PageVisit>,
    pub status: RoundStatus,
    pub evidence_added: usize,
}

impl SearchRound {
    pub fn fetch_attempts(&self) -> usize {
        self.visits.iter().filter(|v| v.status.attempted()).count()
    }
}

/// Terminal classification of a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Supported,
    Refuted,
    /// No sufficient evidence within budget.
    Unsupported,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Supported => "SUPPORTED",
            Verdict::Refuted => "REFUTED",
            Verdict::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementVerdict {
    Supported,
    ContainsUnsupported,
    ContainsRefuted,
}

impl StatementVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementVerdict::Supported => "SUPPORTED",
            StatementVerdict::ContainsUnsupported => "CONTAINS_UNSUPPORTED",
            StatementVerdict::ContainsRefuted => "CONTAINS_REFUTED",
        }
    }
}

impl fmt::Display for StatementVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a claim loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Decided,
    BudgetExhausted,
    JudgeFailed,
    Cancelled,
    Aborted,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Decided => "decided",
            TerminationReason::BudgetExhausted => "budget_exhausted",
            TerminationReason::JudgeFailed => "judge_failed",
            TerminationReason::Cancelled => "cancelled",
            TerminationReason::Aborted => "aborted",
        }
    }
}

/// Final, immutable outcome for one claim plus its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReport {
    pub claim: Claim,
    pub verdict: Verdict,
    pub reason: TerminationReason,
    pub rounds_used: usize,
    pub evidence: Vec<EvidenceItem>,
    pub rounds: Vec<SearchRound>,
}

impl ClaimReport {
    /// Report for a claim whose loop never ran to completion.
    pub fn unverified(claim: Claim, reason: TerminationReason) -> Self {
        Self {
            claim,
            verdict: Verdict::Unsupported,
            reason,
            rounds_used: 0,
            evidence: Vec::new(),
            rounds: Vec::new(),
        }
    }

    pub fn search_history(&self) -> Vec<&str> {
        self.rounds.iter().map(|r| r.query.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_serialises_as_upper_snake() {
        assert_eq!(
            serde_json::to_string(&Verdict::Unsupported).unwrap(),
            "\"UNSUPPORTED\""
        );
        assert_eq!(
            serde_json::to_string(&StatementVerdict::ContainsRefuted).unwrap(),
            "\"CONTAINS_REFUTED\""
        );
    }

    #[test]
    fn visit_status_flattens_into_visit() {
        let visit = PageVisit {
            url: "https://example.org".into(),
            status: VisitStatus::FetchFailed {
                reason: "timeout".into(),
            },
        };
        let json = serde_json::to_value(&visit).unwrap();
        assert_eq!(json["status"], "fetch_failed");
        assert_eq!(json["reason"], "timeout");
        let back: PageVisit = serde_json::from_value(json).unwrap();
        assert_eq!(back, visit);
    }
}
