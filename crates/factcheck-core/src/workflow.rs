//! Statement-level fact checking built on a `graph_flow` graph:
//! `extract_claims` then either `verify_claims` → `aggregate` or
//! `extraction_failed`.

use std::sync::Arc;

use graph_flow::{
    ExecutionStatus, FlowRunner, GraphBuilder, InMemorySessionStorage, Session, SessionStorage,
    Task,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::aggregate::AggregationSummary;
use crate::boundary::ClaimExtractor;
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::error::FactCheckError;
use crate::model::{Claim, ClaimReport};
use crate::report::FactCheckReport;
use crate::retry::RetryPolicy;
use crate::tasks::{
    AGGREGATION_KEY, AggregateTask, CANCELLED_KEY, EXTRACTION_ERROR_KEY, ExtractClaimsTask,
    ExtractionFailedTask, REPORTS_KEY, STATEMENT_KEY, VerifyClaimsTask,
};
use crate::verifier::ClaimVerifier;

/// Tasks wired into one run's graph.
struct RunTasks {
    extract: Arc<ExtractClaimsTask>,
    verify: Arc<VerifyClaimsTask>,
    aggregate: Arc<AggregateTask>,
    extraction_failed: Arc<ExtractionFailedTask>,
}

/// Verifies whole statements: extract claims, verify each, aggregate.
#[derive(Clone)]
pub struct FactChecker {
    extractor: Arc<dyn ClaimExtractor>,
    verifier: ClaimVerifier,
    extractor_retry: RetryPolicy,
    max_concurrent_claims: usize,
}

impl FactChecker {
    pub fn new(extractor: Arc<dyn ClaimExtractor>, verifier: ClaimVerifier) -> Self {
        Self {
            extractor,
            verifier,
            extractor_retry: RetryPolicy::no_retry(std::time::Duration::from_secs(20)),
            max_concurrent_claims: 4,
        }
    }

    /// Apply every configuration section, including the verifier's.
    pub fn configured(mut self, config: &Config) -> Self {
        self.verifier = self.verifier.configured(config);
        self.extractor_retry = RetryPolicy::new(
            config.verification.extractor_retries,
            &config.retry,
            config.timeouts.call_timeout(),
        );
        self.max_concurrent_claims = config.verification.max_concurrent_claims.max(1);
        self
    }

    pub fn with_max_concurrent_claims(mut self, max: usize) -> Self {
        self.max_concurrent_claims = max.max(1);
        self
    }

    pub fn with_verifier(mut self, verifier: ClaimVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn verifier(&self) -> &ClaimVerifier {
        &self.verifier
    }

    pub async fn check(&self, statement: &str) -> Result<FactCheckReport, FactCheckError> {
        self.check_with_cancel(statement, CancelSignal::never()).await
    }

    /// Run the full workflow for `statement`, stopping early when `cancel` fires.
    #[instrument(name = "statement.check", skip_all)]
    pub async fn check_with_cancel(
        &self,
        statement: &str,
        cancel: CancelSignal,
    ) -> Result<FactCheckReport, FactCheckError> {
        let run_id = Uuid::new_v4();
        let tasks = self.run_tasks(cancel);
        let graph = Arc::new(
            GraphBuilder::new("factcheck_workflow")
                .add_task(tasks.extract.clone())
                .add_task(tasks.verify.clone())
                .add_task(tasks.aggregate.clone())
                .add_task(tasks.extraction_failed.clone())
                .add_conditional_edge(
                    tasks.extract.id(),
                    |ctx| ctx.get_sync::<String>(EXTRACTION_ERROR_KEY).is_none(),
                    tasks.verify.id(),
                    tasks.extraction_failed.id(),
                )
                .add_edge(tasks.verify.id(), tasks.aggregate.id())
                .set_start_task(tasks.extract.id())
                .build(),
        );

        let storage = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(graph, storage.clone());
        let session_id = run_id.to_string();
        let session = Session::new_from_task(session_id.clone(), tasks.extract.id());
        session
            .context
            .set(STATEMENT_KEY, statement.to_string())
            .await;
        storage
            .save(session)
            .await
            .map_err(|err| FactCheckError::Workflow(format!("failed to persist session: {err}")))?;

        info!(%run_id, "fact check started");
        loop {
            let result = runner
                .run(&session_id)
                .await
                .map_err(|err| FactCheckError::Workflow(format!("graph execution failure: {err}")))?;

            match result.status {
                ExecutionStatus::Completed => break,
                ExecutionStatus::WaitingForInput => continue,
                ExecutionStatus::Error(message) => return Err(FactCheckError::Workflow(message)),
            }
        }

        let session = storage
            .get(&session_id)
            .await
            .map_err(|err| FactCheckError::Workflow(format!("failed to reload session: {err}")))?
            .ok_or_else(|| FactCheckError::Workflow("session missing after execution".into()))?;
        let context = &session.context;

        if context.get::<bool>(CANCELLED_KEY).await.unwrap_or(false) {
            return Err(FactCheckError::Cancelled);
        }
        if let Some(reason) = context.get::<String>(EXTRACTION_ERROR_KEY).await {
            return Err(FactCheckError::ClaimExtraction(reason));
        }

        let claims: Vec<ClaimReport> = context.get(REPORTS_KEY).await.unwrap_or_default();
        let summary: AggregationSummary = context
            .get(AGGREGATION_KEY)
            .await
            .unwrap_or_else(|| AggregationSummary::from_reports(&claims));

        let report = FactCheckReport {
            run_id,
            summary,
            ..FactCheckReport::new(statement, claims)
        };
        info!(%run_id, verdict = %report.verdict(), "fact check finished");
        Ok(report)
    }

    /// Verify a single, already-extracted claim.
    pub async fn verify_claim(&self, claim: impl Into<String>, cancel: &CancelSignal) -> ClaimReport {
        self.verifier.verify(Claim::new(claim), cancel).await
    }

    fn run_tasks(&self, cancel: CancelSignal) -> RunTasks {
        RunTasks {
            extract: Arc::new(ExtractClaimsTask::new(
                self.extractor.clone(),
                self.extractor_retry.clone(),
                cancel.clone(),
            )),
            verify: Arc::new(VerifyClaimsTask::new(
                self.verifier.clone(),
                self.max_concurrent_claims,
                cancel,
            )),
            aggregate: Arc::new(AggregateTask),
            extraction_failed: Arc::new(ExtractionFailedTask),
        }
    }
}
