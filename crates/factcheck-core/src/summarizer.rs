use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReasoningError;
use crate::model::{Claim, Stance};

/// Result of reading one page against a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryOutcome {
    Relevant { summary: String, stance: Stance },
    /// Normal outcome; the page simply had nothing on the claim.
    NoRelevantContent,
}

#[async_trait]
pub trait EvidenceSummarizer: Send + Sync {
    async fn summarize(
        &self,
        claim: &Claim,
        url: &str,
        page_text: &str,
    ) -> Result<SummaryOutcome, ReasoningError>;
}
