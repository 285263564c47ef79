use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::AggregationSummary;
use crate::boundary::ClaimExtractor;
use crate::cancel::CancelSignal;
use crate::model::{Claim, ClaimReport, TerminationReason};
use crate::retry::RetryPolicy;
use crate::verifier::ClaimVerifier;

pub(crate) const STATEMENT_KEY: &str = "statement";
pub(crate) const CLAIMS_KEY: &str = "claims";
pub(crate) const EXTRACTION_ERROR_KEY: &str = "claims.error";
pub(crate) const REPORTS_KEY: &str = "claims.reports";
pub(crate) const AGGREGATION_KEY: &str = "aggregation";
pub(crate) const CANCELLED_KEY: &str = "run.cancelled";

pub struct ExtractClaimsTask {
    extractor: Arc<dyn ClaimExtractor>,
    retry: RetryPolicy,
    cancel: CancelSignal,
}

impl ExtractClaimsTask {
    pub fn new(extractor: Arc<dyn ClaimExtractor>, retry: RetryPolicy, cancel: CancelSignal) -> Self {
        Self {
            extractor,
            retry,
            cancel,
        }
    }
}

#[async_trait]
impl Task for ExtractClaimsTask {
    fn id(&self) -> &str {
        "extract_claims"
    }

    #[instrument(name = "task.extract_claims", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let statement: String = context.get(STATEMENT_KEY).await.unwrap_or_default();

        let extracted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.retry.run("claim_extractor", || self.extractor.extract(&statement)) => Some(result),
        };

        let message = match extracted {
            Some(Ok(claims)) => {
                info!(claims = claims.len(), "claims extracted");
                debug!(?claims, "extracted claim list");
                let message = format!("Extracted {} claims", claims.len());
                context.set(CLAIMS_KEY, &claims).await;
                message
            }
            Some(Err(err)) => {
                warn!(error = %err, "claim extraction failed");
                context.set_sync(EXTRACTION_ERROR_KEY, err.to_string());
                "Claim extraction failed".to_string()
            }
            None => {
                context.set_sync(CANCELLED_KEY, true);
                context.set_sync(EXTRACTION_ERROR_KEY, "cancelled".to_string());
                "Cancelled before claim extraction finished".to_string()
            }
        };

        Ok(TaskResult::new(Some(message), NextAction::ContinueAndExecute))
    }
}

/// Verifies every extracted claim with bounded concurrency.
pub struct VerifyClaimsTask {
    verifier: ClaimVerifier,
    max_concurrent: usize,
    cancel: CancelSignal,
}

impl VerifyClaimsTask {
    pub fn new(verifier: ClaimVerifier, max_concurrent: usize, cancel: CancelSignal) -> Self {
        Self {
            verifier,
            max_concurrent: max_concurrent.max(1),
            cancel,
        }
    }
}

#[async_trait]
impl Task for VerifyClaimsTask {
    fn id(&self) -> &str {
        "verify_claims"
    }

    #[instrument(name = "task.verify_claims", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let claims: Vec<String> = context.get(CLAIMS_KEY).await.unwrap_or_default();
        let reports = verify_all(&self.verifier, &claims, self.max_concurrent, &self.cancel).await;

        if self.cancel.is_cancelled() {
            context.set_sync(CANCELLED_KEY, true);
        }
        context.set(REPORTS_KEY, &reports).await;

        Ok(TaskResult::new(
            Some(format!("Verified {} claims", reports.len())),
            NextAction::ContinueAndExecute,
        ))
    }
}

/// Fan claims out over a worker pool; reports come back in claim order.
pub(crate) async fn verify_all(
    verifier: &ClaimVerifier,
    claims: &[String],
    max_concurrent: usize,
    cancel: &CancelSignal,
) -> Vec<ClaimReport> {
    let permits = Arc::new(Semaphore::new(max_concurrent));
    let mut workers = JoinSet::new();

    for (index, text) in claims.iter().enumerate() {
        let permits = permits.clone();
        let verifier = verifier.clone();
        let cancel = cancel.clone();
        let claim = Claim::new(text.clone());
        workers.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return (index, ClaimReport::unverified(claim, TerminationReason::Aborted));
            };
            (index, verifier.verify(claim, &cancel).await)
        });
    }

    let mut reports: Vec<Option<ClaimReport>> = vec![None; claims.len()];
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((index, report)) => reports[index] = Some(report),
            Err(err) => warn!(error = %err, "claim worker failed"),
        }
    }

    reports
        .into_iter()
        .zip(claims)
        .map(|(report, text)| {
            report.unwrap_or_else(|| {
                ClaimReport::unverified(Claim::new(text.clone()), TerminationReason::Aborted)
            })
        })
        .collect()
}

#[derive(Default)]
pub struct AggregateTask;

#[async_trait]
impl Task for AggregateTask {
    fn id(&self) -> &str {
        "aggregate"
    }

    #[instrument(name = "task.aggregate", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let reports: Vec<ClaimReport> = context.get(REPORTS_KEY).await.unwrap_or_default();
        let summary = AggregationSummary::from_reports(&reports);

        info!(
            verdict = %summary.verdict,
            supported = summary.supported,
            refuted = summary.refuted,
            unsupported = summary.unsupported,
            "statement aggregated"
        );
        let message = summary.reasoning.clone();
        context.set(AGGREGATION_KEY, &summary).await;

        Ok(TaskResult::new(Some(message), NextAction::End))
    }
}

#[derive(Default)]
pub struct ExtractionFailedTask;

#[async_trait]
impl Task for ExtractionFailedTask {
    fn id(&self) -> &str {
        "extraction_failed"
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let reason = context
            .get_sync::<String>(EXTRACTION_ERROR_KEY)
            .unwrap_or_else(|| "unknown extraction failure".to_string());
        Ok(TaskResult::new(
            Some(format!("Statement not verified: {reason}")),
            NextAction::End,
        ))
    }
}
