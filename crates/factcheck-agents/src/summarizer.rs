use std::sync::Arc;

use async_trait::async_trait;
use factcheck_core::{
    Claim, EvidenceSummarizer, ReasoningError, SummaryOutcome, decode_summary, extract_json,
};
use tracing::instrument;

use crate::llm::{ReasoningClient, ReasoningRequest};
use crate::prompts::{SUMMARIZER_SYSTEM, summarizer_user};

#[derive(Clone)]
pub struct LlmEvidenceSummarizer {
    client: Arc<dyn ReasoningClient>,
}

impl LlmEvidenceSummarizer {
    pub fn new(client: Arc<dyn ReasoningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EvidenceSummarizer for LlmEvidenceSummarizer {
    #[instrument(name = "agent.summarizer", skip_all, fields(url = %url))]
    async fn summarize(
        &self,
        claim: &Claim,
        url: &str,
        page_text: &str,
    ) -> Result<SummaryOutcome, ReasoningError> {
        if page_text.trim().is_empty() {
            return Ok(SummaryOutcome::NoRelevantContent);
        }
        let prompt = ReasoningRequest::new(SUMMARIZER_SYSTEM, summarizer_user(claim, url, page_text));
        let raw = self.client.complete(&prompt).await?;
        decode_summary(&extract_json(&raw)?)
    }
}
