use std::sync::Arc;

use async_trait::async_trait;
use factcheck_core::{
    ClaimJudge, JudgeDecision, JudgeRequest, ReasoningError, decode_judge_output, extract_json,
};
use tracing::instrument;

use crate::llm::{ReasoningClient, ReasoningRequest};
use crate::prompts::{JUDGE_SYSTEM, judge_user};

/// Claim judge backed by a reasoning model. Decoding is strict; retries are
/// the verifier's concern.
#[derive(Clone)]
pub struct LlmClaimJudge {
    client: Arc<dyn ReasoningClient>,
}

impl LlmClaimJudge {
    pub fn new(client: Arc<dyn ReasoningClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClaimJudge for LlmClaimJudge {
    #[instrument(name = "agent.judge", skip_all, fields(rounds_remaining = request.rounds_remaining))]
    async fn decide(&self, request: JudgeRequest<'_>) -> Result<JudgeDecision, ReasoningError> {
        let prompt = ReasoningRequest::new(JUDGE_SYSTEM, judge_user(&request));
        let raw = self.client.complete(&prompt).await?;
        decode_judge_output(&extract_json(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedClient;
    use factcheck_core::{Claim, Verdict};

    fn request(claim: &Claim) -> JudgeRequest<'_> {
        JudgeRequest {
            claim,
            evidence: &[],
            search_history: &[],
            rounds_remaining: 3,
        }
    }

    #[tokio::test]
    async fn decodes_query_and_verdict() {
        let client = Arc::new(ScriptedClient::new([
            r#"{"reasoning": "need data", "verdict": null, "next_search": "eiffel tower completion date"}"#,
            "```json\n{\"verdict\": \"not supported\", \"next_search\": null}\n```",
        ]));
        let judge = LlmClaimJudge::new(client.clone());
        let claim = Claim::new("The Eiffel Tower was completed in 1889");

        assert_eq!(
            judge.decide(request(&claim)).await.unwrap(),
            JudgeDecision::Research("eiffel tower completion date".into())
        );
        assert_eq!(
            judge.decide(request(&claim)).await.unwrap(),
            JudgeDecision::Verdict(Verdict::Unsupported)
        );
        assert!(client.prompts()[0].user.contains("Claim: The Eiffel Tower"));
    }

    #[tokio::test]
    async fn prose_answer_is_malformed() {
        let judge = LlmClaimJudge::new(Arc::new(ScriptedClient::new(["It is true."])));
        let claim = Claim::new("x");
        assert!(matches!(
            judge.decide(request(&claim)).await,
            Err(ReasoningError::Malformed(_))
        ));
    }
}
