//! Instructions and payload rendering for each reasoning role.

use std::fmt::Write as _;

use factcheck_core::{Claim, EvidenceItem, JudgeRequest, SearchHit};

pub const JUDGE_SYSTEM: &str = "\
You verify a single factual claim using evidence gathered from web research.
Decide exactly one of:
- a verdict, when the evidence settles the claim: \"supported\" if it clearly confirms the claim, \"refuted\" if it clearly contradicts it, \"not_supported\" if no further search is likely to help;
- a next search query, when more evidence is needed. The query must differ from every query in the search history.
Reply with a JSON object: {\"reasoning\": string, \"verdict\": \"supported\" | \"refuted\" | \"not_supported\" | null, \"next_search\": string | null}.
Set exactly one of verdict and next_search; the other must be null.";

pub const SELECTOR_SYSTEM: &str = "\
You choose which search results to read while fact-checking a claim.
Prefer primary and authoritative sources likely to confirm or refute the claim directly over tangential pages. Break ties by search rank.
Never choose a URL listed as already visited. Only choose URLs that appear in the results.
Reply with a JSON object: {\"reasoning\": string, \"selected_urls\": [string]}. Use an empty list when nothing is worth reading.";

pub const SUMMARIZER_SYSTEM: &str = "\
You extract evidence about a factual claim from the content of one web page.
Report only facts stated on the page that bear on the claim, attributed to the source.
Reply with a JSON object: {\"relevant\": boolean, \"evidence\": string | null, \"stance\": \"supports\" | \"refutes\" | \"neutral\" | null}.
Use relevant=false and evidence=null when the page says nothing about the claim.";

pub const EXTRACTOR_SYSTEM: &str = "\
You split a statement into distinct, self-contained factual claims that can each be checked independently.
Resolve pronouns so every claim stands alone. Omit opinions and questions.
Reply with a JSON object: {\"claims\": [string]}.";

pub fn judge_user(request: &JudgeRequest<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Claim: {}", request.claim);
    out.push_str("\nEvidence:\n");
    render_evidence(&mut out, request.evidence);
    out.push_str("\nSearch history:\n");
    if request.search_history.is_empty() {
        out.push_str("(no searches yet)\n");
    }
    for query in request.search_history {
        let _ = writeln!(out, "- {query}");
    }
    let _ = writeln!(out, "\nResearch rounds remaining: {}", request.rounds_remaining);
    if request.rounds_remaining == 0 {
        out.push_str("No more searches are possible; give a verdict.\n");
    }
    out
}

pub fn selector_user(
    claim: &Claim,
    results: &[SearchHit],
    visited: &[String],
    max_pages: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Claim: {claim}");
    let _ = writeln!(out, "Choose at most {max_pages} URLs.\n\nSearch results:");
    for hit in results {
        let _ = writeln!(
            out,
            "{}. {}\n   URL: {}\n   {}",
            hit.rank, hit.title, hit.url, hit.snippet
        );
    }
    out.push_str("\nAlready visited:\n");
    if visited.is_empty() {
        out.push_str("(none)\n");
    }
    for url in visited {
        let _ = writeln!(out, "- {url}");
    }
    out
}

pub fn summarizer_user(claim: &Claim, url: &str, page_text: &str) -> String {
    format!("Claim: {claim}\nSource URL: {url}\n\nPage content:\n{page_text}")
}

pub fn extractor_user(statement: &str) -> String {
    format!("Statement: {statement}")
}

fn render_evidence(out: &mut String, evidence: &[EvidenceItem]) {
    if evidence.is_empty() {
        out.push_str("(none gathered yet)\n");
        return;
    }
    for (idx, item) in evidence.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{}] {} (source: {})",
            idx + 1,
            item.stance.as_str(),
            item.summary,
            item.source_url
        );
    }
}
