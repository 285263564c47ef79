//! Language-model and HTTP collaborators for the fact-checking core.

mod extractor;
mod fetch;
mod judge;
mod llm;
mod prompts;
mod search;
mod selector;
mod summarizer;

#[cfg(test)]
mod scripted;

use std::sync::Arc;

use factcheck_core::{
    AuthorityPageSelector, ClaimVerifier, Config, FactCheckError, FactChecker, PageSelector,
    ProviderKeys, ResearchAgent, SelectorKind,
};

pub use extractor::LlmClaimExtractor;
pub use fetch::FirecrawlFetcher;
pub use judge::LlmClaimJudge;
pub use llm::{OpenAiReasoningClient, ReasoningClient, ReasoningRequest};
pub use search::SerperSearch;
pub use selector::LlmPageSelector;
pub use summarizer::LlmEvidenceSummarizer;

/// Wire the production pipeline from configuration. API keys come from the
/// environment variables the config names.
pub fn build_fact_checker(config: &Config) -> Result<FactChecker, FactCheckError> {
    let keys = ProviderKeys::from_env(config)?;
    let call_timeout = config.timeouts.call_timeout();
    let reasoning: Arc<dyn ReasoningClient> = Arc::new(OpenAiReasoningClient::new(
        &config.llm,
        keys.llm,
        call_timeout,
    )?);
    let search = SerperSearch::new(&config.search, keys.search, call_timeout)?;
    let fetcher = FirecrawlFetcher::new(
        &config.fetcher,
        keys.fetcher,
        config.timeouts.fetch_timeout(),
    )?;

    let selector: Arc<dyn PageSelector> = match config.research.selector {
        SelectorKind::Llm => Arc::new(LlmPageSelector::new(reasoning.clone())),
        SelectorKind::Authority => Arc::new(AuthorityPageSelector::new()),
    };
    tracing::debug!(
        model = %config.llm.model,
        selector = ?config.research.selector,
        "building fact checker"
    );

    let research = ResearchAgent::new(
        Arc::new(search),
        selector,
        Arc::new(fetcher),
        Arc::new(LlmEvidenceSummarizer::new(reasoning.clone())),
    );
    let verifier = ClaimVerifier::new(Arc::new(LlmClaimJudge::new(reasoning.clone())), research);
    let extractor = Arc::new(LlmClaimExtractor::new(reasoning));

    Ok(FactChecker::new(extractor, verifier).configured(config))
}
