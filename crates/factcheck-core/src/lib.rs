//! FactCheck core: budgeted, web-evidence claim verification built on `graph_flow`.
//!
//! A statement is split into claims; each claim runs a judge loop that
//! alternates between asking for one bounded research round and emitting a
//! verdict. Per-claim verdicts are merged into one statement verdict.

mod aggregate;
mod boundary;
mod cancel;
mod config;
mod decode;
mod error;
mod events;
mod judge;
mod metrics;
mod model;
mod report;
mod research;
mod retry;
mod security;
mod selector;
mod summarizer;
mod tasks;
mod telemetry;
mod verifier;
mod workflow;

#[cfg(test)]
mod stubs;

pub use aggregate::{AggregationSummary, aggregate};
pub use boundary::{ClaimExtractor, FetchedPage, PageFetcher, SearchProvider};
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{
    Config, ConfigLoader, FetcherConfig, LlmConfig, LoggingConfig, MAX_PAGE_VISITS, ResearchConfig,
    RetryConfig, SearchConfig, SelectorKind, TimeoutConfig, VerificationConfig,
};
pub use decode::{
    clean_url, decode_claims, decode_judge_output, decode_selection, decode_summary, extract_json,
    parse_stance, parse_verdict,
};
pub use error::{FactCheckError, FetchError, ReasoningError, SearchError};
pub use events::{EventCollector, EventId, EventLog, VerificationEvent};
pub use judge::{ClaimJudge, JudgeDecision, JudgeRequest};
pub use metrics::init_metrics_from_env;
pub use model::{
    Claim, ClaimReport, EvidenceItem, PageVisit, RoundStatus, SearchHit, SearchRound, Stance,
    StatementVerdict, TerminationReason, Verdict, VisitStatus,
};
pub use report::{FactCheckReport, persist_report};
pub use research::{EarlyStopPolicy, ResearchAgent, ResearchSettings, RoundOutput};
pub use retry::RetryPolicy;
pub use security::{ProviderKeys, SecretValue, require_env};
pub use selector::{AuthorityPageSelector, PageSelector, host_of};
pub use summarizer::{EvidenceSummarizer, SummaryOutcome};
pub use telemetry::{LogFormat, TelemetryOptions, init_telemetry};
pub use verifier::{ClaimJudgeState, ClaimVerifier, JudgeStage};
pub use workflow::FactChecker;
