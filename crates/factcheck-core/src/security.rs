use std::env;

use crate::FactCheckError;
use crate::config::Config;

const REDACTED: &str = "***redacted***";

/// Provider API key. Never printed by `Debug`, and scrubbed from provider
/// error text before that text is logged or stored in a report.
#[derive(Clone)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `text` with every occurrence of the key replaced.
    pub fn scrub(&self, text: &str) -> String {
        let key = self.0.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, REDACTED)
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Require that a given environment variable is set and non-empty.
pub fn require_env(var: &str) -> Result<SecretValue, FactCheckError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretValue(value.trim().to_string())),
        _ => Err(FactCheckError::MissingSecret(var.to_string())),
    }
}

/// Keys for the reasoning endpoint, the search provider and the page fetcher.
#[derive(Debug, Clone)]
pub struct ProviderKeys {
    pub llm: SecretValue,
    pub search: SecretValue,
    pub fetcher: SecretValue,
}

impl ProviderKeys {
    /// Resolve every key named in `config`. A failure names all missing
    /// variables at once, comma separated.
    pub fn from_env(config: &Config) -> Result<Self, FactCheckError> {
        let llm = require_env(&config.llm.api_key_env);
        let search = require_env(&config.search.api_key_env);
        let fetcher = require_env(&config.fetcher.api_key_env);

        match (llm, search, fetcher) {
            (Ok(llm), Ok(search), Ok(fetcher)) => Ok(Self {
                llm,
                search,
                fetcher,
            }),
            (llm, search, fetcher) => {
                let missing: Vec<String> = [llm.err(), search.err(), fetcher.err()]
                    .into_iter()
                    .flatten()
                    .map(|err| match err {
                        FactCheckError::MissingSecret(name) => name,
                        other => other.to_string(),
                    })
                    .collect();
                Err(FactCheckError::MissingSecret(missing.join(", ")))
            }
        }
    }
}
