use std::sync::Arc;

use async_trait::async_trait;
use factcheck_core::{ClaimExtractor, ReasoningError, decode_claims, extract_json};
use tracing::instrument;

use crate::llm::{ReasoningClient, ReasoningRequest};
use crate::prompts::{EXTRACTOR_SYSTEM, extractor_user};

#[derive(Clone)]
pub struct LlmClaimExtractor {
    client: Arc<dyn ReasoningClient>,
}

impl LlmClaimExtractor {
    pub fn new(client: Arc<dyn ReasoningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClaimExtractor for LlmClaimExtractor {
    #[instrument(name = "agent.extractor", skip_all)]
    async fn extract(&self, statement: &str) -> Result<Vec<String>, ReasoningError> {
        if statement.trim().is_empty() {
            return Ok(Vec::new());
        }
        let prompt = ReasoningRequest::new(EXTRACTOR_SYSTEM, extractor_user(statement));
        let raw = self.client.complete(&prompt).await?;
        decode_claims(&extract_json(&raw)?)
    }
}
