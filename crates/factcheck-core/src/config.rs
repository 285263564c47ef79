use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::telemetry::LogFormat;
use crate::FactCheckError;

const DEFAULT_CONFIG_PATH: &str = "factcheck.toml";
const CONFIG_PATH_ENV: &str = "FACTCHECK_CONFIG";

/// Hard ceiling on page visits per research round.
pub const MAX_PAGE_VISITS: usize = 3;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub verification: VerificationConfig,
    pub research: ResearchConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub fetcher: FetcherConfig,
    pub logging: LoggingConfig,
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `FACTCHECK_CONFIG` environment variable.
    /// 3. `factcheck.toml` in the current working directory.
    pub fn load(path: Option<PathBuf>) -> Result<Config, FactCheckError> {
        let candidate = resolve_path(path);
        let raw = fs::read_to_string(&candidate)
            .map_err(|err| FactCheckError::config_io(candidate.clone(), err))?;
        Self::from_toml(&raw)
    }

    /// Like [`ConfigLoader::load`], but an absent default file yields built-in defaults.
    /// An explicitly requested file must exist.
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Config, FactCheckError> {
        let explicit = path.is_some() || env::var(CONFIG_PATH_ENV).is_ok_and(|v| !v.trim().is_empty());
        let candidate = resolve_path(path);
        if !explicit && !candidate.exists() {
            tracing::debug!(path = %candidate.display(), "no config file found; using defaults");
            let config = Config::default();
            Self::validate(&config)?;
            return Ok(config);
        }
        Self::load(Some(candidate))
    }

    pub fn from_toml(raw: &str) -> Result<Config, FactCheckError> {
        let config: Config = toml::from_str(raw)
            .map_err(|err| FactCheckError::InvalidConfiguration(err.to_string()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), FactCheckError> {
        let invalid = |msg: &str| Err(FactCheckError::InvalidConfiguration(msg.to_string()));

        if config.verification.round_budget == 0 {
            return invalid("verification.round_budget must be at least 1");
        }
        if config.verification.max_concurrent_claims == 0 {
            return invalid("verification.max_concurrent_claims must be at least 1");
        }
        if !(1..=MAX_PAGE_VISITS).contains(&config.research.max_page_visits) {
            return invalid("research.max_page_visits must be between 1 and 3");
        }
        if config.research.visit_concurrency == 0 {
            return invalid("research.visit_concurrency must be at least 1");
        }
        if config.research.search_results == 0 {
            return invalid("research.search_results must be at least 1");
        }
        for (name, value) in [
            ("llm.api_key_env", &config.llm.api_key_env),
            ("search.api_key_env", &config.search.api_key_env),
            ("fetcher.api_key_env", &config.fetcher.api_key_env),
        ] {
            if value.trim().is_empty() {
                return Err(FactCheckError::InvalidConfiguration(format!(
                    "{name} must reference an environment variable"
                )));
            }
        }
        Ok(())
    }
}

fn resolve_path(path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = path {
        return path;
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return PathBuf::from(from_env);
        }
    }

    Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Maximum research rounds per claim.
    pub round_budget: usize,
    /// Extra attempts after a failed or undecodable judge call.
    pub judge_retries: usize,
    pub max_concurrent_claims: usize,
    pub extractor_retries: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            round_budget: 3,
            judge_retries: 2,
            max_concurrent_claims: 4,
            extractor_retries: 2,
        }
    }
}

/// Which page selector implementation to wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Llm,
    Authority,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub max_page_visits: usize,
    pub search_results: usize,
    pub max_page_chars: usize,
    pub visit_concurrency: usize,
    /// Decisive evidence items in one round that end the round early; `0` disables.
    pub early_stop_min_decisive: usize,
    pub selector_retries: usize,
    pub summarizer_retries: usize,
    pub selector: SelectorKind,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_page_visits: MAX_PAGE_VISITS,
            search_results: 10,
            max_page_chars: 10_000,
            visit_concurrency: MAX_PAGE_VISITS,
            early_stop_min_decisive: 1,
            selector_retries: 2,
            summarizer_retries: 1,
            selector: SelectorKind::Llm,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub call_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
}

impl TimeoutConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 20_000,
            fetch_timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub country: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key_env: "SERPER_API_KEY".to_string(),
            country: "us".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub endpoint: String,
    pub api_key_env: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.firecrawl.dev/v1/scrape".to_string(),
            api_key_env: "FIRECRAWL_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info` or `factcheck_core=debug,info`.
    pub level: String,
    pub ansi: bool,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            format: LogFormat::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ConfigLoader::from_toml(
            r#"
            [verification]
            round_budget = 5

            [research]
            selector = "authority"
            early_stop_min_decisive = 0
            "#,
        )
        .expect("config parses");

        assert_eq!(config.verification.round_budget, 5);
        assert_eq!(config.verification.judge_retries, 2);
        assert_eq!(config.research.max_page_visits, 3);
        assert_eq!(config.research.selector, SelectorKind::Authority);
        assert_eq!(config.research.early_stop_min_decisive, 0);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn logging_section_parses() {
        let config =
            ConfigLoader::from_toml("[logging]\nlevel = \"debug\"\nformat = \"compact\"\nansi = false\n")
                .expect("config parses");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(!config.logging.ansi);
    }

    #[test]
    fn rejects_visit_cap_above_three() {
        let err = ConfigLoader::from_toml("[research]\nmax_page_visits = 4\n").unwrap_err();
        assert!(matches!(err, FactCheckError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_zero_round_budget() {
        let err = ConfigLoader::from_toml("[verification]\nround_budget = 0\n").unwrap_err();
        assert!(err.to_string().contains("round_budget"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_or_default(Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, FactCheckError::ConfigIo { .. }));
    }
}
