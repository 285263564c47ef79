//! Choosing which search results to visit.

use std::cmp::Reverse;
use std::collections::HashSet;

use async_trait::async_trait;
use url::Url;

use crate::error::ReasoningError;
use crate::model::{Claim, SearchHit};

/// `(claim, ranked results) -> ordered subset of at most `max_pages` URLs`.
///
/// Implementations should respect `max_pages`; the research agent truncates
/// regardless.
#[async_trait]
pub trait PageSelector: Send + Sync {
    async fn select(
        &self,
        claim: &Claim,
        results: &[SearchHit],
        visited: &[String],
        max_pages: usize,
    ) -> Result<Vec<String>, ReasoningError>;
}

const PRIMARY_SUFFIXES: &[&str] = &["gov", "gov.uk", "gov.au", "edu", "ac.uk", "int", "mil"];

const REFERENCE_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "britannica.com",
    "reuters.com",
    "apnews.com",
    "bbc.co.uk",
    "bbc.com",
    "npr.org",
    "nature.com",
    "science.org",
    "un.org",
    "worldbank.org",
    "snopes.com",
    "factcheck.org",
    "politifact.com",
];

const LOW_SIGNAL_DOMAINS: &[&str] = &[
    "reddit.com",
    "quora.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "pinterest.com",
    "youtube.com",
];

const STOPWORDS: &[&str] = &[
    "the", "and", "was", "were", "for", "with", "that", "this", "from", "has", "have", "had",
    "are", "its", "into", "than", "then", "which", "who", "what", "when", "been", "also",
];

/// Deterministic selector preferring primary and reference sources that
/// mention the claim's terms. Ties keep search rank order.
#[derive(Debug, Default, Clone)]
pub struct AuthorityPageSelector;

impl AuthorityPageSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn rank<'a>(
        &self,
        claim: &Claim,
        results: &'a [SearchHit],
        visited: &[String],
        max_pages: usize,
    ) -> Vec<&'a SearchHit> {
        let terms = claim_terms(claim.as_str());
        let visited: HashSet<&str> = visited.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();

        let mut candidates: Vec<(&SearchHit, usize, i8)> = results
            .iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .filter(|hit| !visited.contains(hit.url.as_str()))
            .filter(|hit| seen.insert(hit.url.as_str()))
            .map(|hit| (hit, term_overlap(&terms, hit), authority_tier(&hit.url)))
            .collect();

        // Stable sort: equal keys stay in provider order.
        candidates.sort_by_key(|(hit, overlap, tier)| {
            (Reverse(*overlap > 0), Reverse(*tier), Reverse(*overlap), hit.rank)
        });

        candidates
            .into_iter()
            .take(max_pages)
            .map(|(hit, _, _)| hit)
            .collect()
    }
}

#[async_trait]
impl PageSelector for AuthorityPageSelector {
    async fn select(
        &self,
        claim: &Claim,
        results: &[SearchHit],
        visited: &[String],
        max_pages: usize,
    ) -> Result<Vec<String>, ReasoningError> {
        Ok(self
            .rank(claim, results, visited, max_pages)
            .into_iter()
            .map(|hit| hit.url.clone())
            .collect())
    }
}

/// Lower-cased host without a leading `www.` or a trailing dot. Input without
/// a scheme is read as `https`. `None` when the URL does not parse or has no host.
pub fn host_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{raw}")).ok()?,
        Err(_) => return None,
    };
    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

fn authority_tier(url: &str) -> i8 {
    let Some(host) = host_of(url) else {
        return 0;
    };
    if PRIMARY_SUFFIXES.iter().any(|suffix| matches_domain(&host, suffix)) {
        2
    } else if REFERENCE_DOMAINS.iter().any(|d| matches_domain(&host, d)) {
        1
    } else if LOW_SIGNAL_DOMAINS.iter().any(|d| matches_domain(&host, d)) {
        -1
    } else {
        0
    }
}

fn claim_terms(claim: &str) -> HashSet<String> {
    claim
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3 || w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

fn term_overlap(terms: &HashSet<String>, hit: &SearchHit) -> usize {
    let haystack = format!("{} {}", hit.title, hit.snippet).to_lowercase();
    let words: HashSet<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    terms.iter().filter(|t| words.contains(t.as_str())).count()
}
