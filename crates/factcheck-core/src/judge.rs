//! The claim judge's decision contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReasoningError;
use crate::model::{Claim, EvidenceItem, Verdict};

/// Exactly one of a verdict or a follow-up search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "value", rename_all = "snake_case")]
pub enum JudgeDecision {
    Verdict(Verdict),
    Research(String),
}

/// Everything the judge may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub claim: &'a Claim,
    pub evidence: &'a [EvidenceItem],
    pub search_history: &'a [String],
    pub rounds_remaining: usize,
}

/// Decision function of the claim judge. Implementations must depend only on
/// the request contents so repeated calls over the same history agree.
#[async_trait]
pub trait ClaimJudge: Send + Sync {
    async fn decide(&self, request: JudgeRequest<'_>) -> Result<JudgeDecision, ReasoningError>;
}
