//! Strict decoding of structured reasoning output.
//!
//! Reasoning calls answer with JSON objects. Anything that does not decode into
//! the expected shape is `Malformed`; a well-formed answer without a usable
//! decision is `Ambiguous`. Both are retryable at the call site.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ReasoningError;
use crate::judge::JudgeDecision;
use crate::model::{Stance, Verdict};
use crate::summarizer::SummaryOutcome;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("invalid fence regex"));

/// Parse a JSON object from raw model text, accepting a fenced code block.
pub fn extract_json(text: &str) -> Result<Value, ReasoningError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return expect_object(value);
    }

    if let Some(caps) = FENCED_JSON.captures(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&caps[1]) {
            return expect_object(value);
        }
    }

    // Last resort: outermost braces.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return expect_object(value);
            }
        }
    }

    Err(ReasoningError::Malformed(format!(
        "no JSON object in output: {}",
        preview(trimmed)
    )))
}

fn expect_object(value: Value) -> Result<Value, ReasoningError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ReasoningError::Malformed("expected a JSON object".into()))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

/// Spelled-out nulls models write into optional fields.
const NULL_PLACEHOLDERS: &[&str] = &["null", "none", "n/a", "nil"];

/// Optional string field; `null`, absent, blank and placeholder text all read as `None`.
fn optional_str<'a>(value: &'a Value, key: &str) -> Result<Option<&'a str>, ReasoningError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s))
            if NULL_PLACEHOLDERS
                .iter()
                .any(|p| s.trim().eq_ignore_ascii_case(p)) =>
        {
            Ok(None)
        }
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(other) => Err(ReasoningError::Malformed(format!(
            "field `{key}` must be a string, got {other}"
        ))),
    }
}

fn normalise_label(label: &str) -> String {
    label
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

pub fn parse_verdict(label: &str) -> Result<Verdict, ReasoningError> {
    match normalise_label(label).as_str() {
        "supported" => Ok(Verdict::Supported),
        "refuted" => Ok(Verdict::Refuted),
        "not_supported" | "unsupported" => Ok(Verdict::Unsupported),
        other => Err(ReasoningError::Malformed(format!("unknown verdict `{other}`"))),
    }
}

pub fn parse_stance(label: &str) -> Result<Stance, ReasoningError> {
    match normalise_label(label).as_str() {
        "supports" | "supported" | "support" => Ok(Stance::Supports),
        "refutes" | "refuted" | "refute" | "contradicts" => Ok(Stance::Refutes),
        "neutral" | "unclear" | "neutral_or_unclear" => Ok(Stance::NeutralOrUnclear),
        other => Err(ReasoningError::Malformed(format!("unknown stance `{other}`"))),
    }
}

/// Decode `{"verdict": ..., "next_search": ...}` into exactly one decision.
pub fn decode_judge_output(value: &Value) -> Result<JudgeDecision, ReasoningError> {
    let verdict = optional_str(value, "verdict")?
        .map(parse_verdict)
        .transpose()?;
    let next_search = optional_str(value, "next_search")?;

    match (verdict, next_search) {
        (Some(verdict), Some(query)) => {
            tracing::warn!(%verdict, query, "judge returned both a verdict and a query; keeping the verdict");
            Ok(JudgeDecision::Verdict(verdict))
        }
        (Some(verdict), None) => Ok(JudgeDecision::Verdict(verdict)),
        (None, Some(query)) => Ok(JudgeDecision::Research(query.to_string())),
        (None, None) => Err(ReasoningError::Ambiguous(
            "judge returned neither a verdict nor a search query".into(),
        )),
    }
}

/// Strip the decoration models tend to put around URLs.
pub fn clean_url(raw: &str) -> String {
    raw.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '`' | '['))
        .trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '`' | ']' | '.' | ',' | ';')
        })
        .to_string()
}

/// Decode `{"selected_urls": [...]}` or `{"selected_url": "..."}` preserving order.
pub fn decode_selection(value: &Value) -> Result<Vec<String>, ReasoningError> {
    let raw: Vec<&str> = match (value.get("selected_urls"), value.get("selected_url")) {
        (Some(Value::Array(items)), _) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    ReasoningError::Malformed("selected_urls must contain strings".into())
                })
            })
            .collect::<Result<_, _>>()?,
        (Some(Value::Null) | None, Some(Value::String(url))) => vec![url.as_str()],
        (Some(Value::Null) | None, Some(Value::Null) | None) => Vec::new(),
        _ => {
            return Err(ReasoningError::Malformed(
                "selection must be a list of URLs".into(),
            ));
        }
    };

    Ok(raw
        .into_iter()
        .map(clean_url)
        .filter(|url| !url.is_empty())
        .collect())
}

/// Decode `{"relevant": bool, "evidence": str, "stance": str}`.
pub fn decode_summary(value: &Value) -> Result<SummaryOutcome, ReasoningError> {
    let relevant = match value.get("relevant") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(ReasoningError::Malformed(format!(
                "field `relevant` must be a boolean, got {other}"
            )));
        }
    };
    let evidence = optional_str(value, "evidence")?;

    match (relevant, evidence) {
        (false, _) | (true, None) => Ok(SummaryOutcome::NoRelevantContent),
        (true, Some(summary)) => {
            let stance = match optional_str(value, "stance")? {
                Some(label) => parse_stance(label)?,
                None => Stance::NeutralOrUnclear,
            };
            Ok(SummaryOutcome::Relevant {
                summary: summary.to_string(),
                stance,
            })
        }
    }
}

/// Decode `{"claims": [...]}` into trimmed, de-duplicated claims in order.
pub fn decode_claims(value: &Value) -> Result<Vec<String>, ReasoningError> {
    let items = value
        .get("claims")
        .and_then(Value::as_array)
        .ok_or_else(|| ReasoningError::Malformed("missing `claims` array".into()))?;

    let mut claims: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let text = item
            .as_str()
            .ok_or_else(|| ReasoningError::Malformed("claims must be strings".into()))?
            .trim();
        if !text.is_empty() && !claims.iter().any(|c| c == text) {
            claims.push(text.to_string());
        }
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_fenced_json() {
        let text = "Here you go:\n```json\n{\"verdict\": \"supported\"}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["verdict"], "supported");
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            extract_json("I think it is true."),
            Err(ReasoningError::Malformed(_))
        ));
        assert!(matches!(
            extract_json("[1, 2]"),
            Err(ReasoningError::Malformed(_))
        ));
    }

    #[test]
    fn judge_verdict_wins_over_query() {
        let decision =
            decode_judge_output(&json!({"verdict": "Refuted", "next_search": "more"})).unwrap();
        assert_eq!(decision, JudgeDecision::Verdict(Verdict::Refuted));
    }

    #[test]
    fn judge_query_only() {
        let decision =
            decode_judge_output(&json!({"verdict": null, "next_search": " eiffel tower 1889 "}))
                .unwrap();
        assert_eq!(decision, JudgeDecision::Research("eiffel tower 1889".into()));
    }

    #[test]
    fn judge_placeholder_nulls_read_as_absent() {
        let decision =
            decode_judge_output(&json!({"verdict": "None", "next_search": "eiffel completion date"}))
                .unwrap();
        assert_eq!(
            decision,
            JudgeDecision::Research("eiffel completion date".into())
        );

        let decision =
            decode_judge_output(&json!({"verdict": "supported", "next_search": "null"})).unwrap();
        assert_eq!(decision, JudgeDecision::Verdict(Verdict::Supported));

        let err = decode_judge_output(&json!({"verdict": "NONE", "next_search": " None "}))
            .unwrap_err();
        assert!(matches!(err, ReasoningError::Ambiguous(_)));
    }

    #[test]
    fn judge_neither_is_ambiguous() {
        let err = decode_judge_output(&json!({"reasoning": "hmm", "next_search": "  "})).unwrap_err();
        assert!(matches!(err, ReasoningError::Ambiguous(_)));
    }

    #[test]
    fn judge_unknown_label_is_malformed() {
        let err = decode_judge_output(&json!({"verdict": "probably"})).unwrap_err();
        assert!(matches!(err, ReasoningError::Malformed(_)));
        let err = decode_judge_output(&json!({"verdict": 3})).unwrap_err();
        assert!(matches!(err, ReasoningError::Malformed(_)));
    }

    #[test]
    fn verdict_label_variants() {
        assert_eq!(parse_verdict("Not Supported").unwrap(), Verdict::Unsupported);
        assert_eq!(parse_verdict("not-supported").unwrap(), Verdict::Unsupported);
        assert_eq!(parse_verdict("SUPPORTED").unwrap(), Verdict::Supported);
    }

    #[test]
    fn selection_cleans_urls() {
        let urls = decode_selection(&json!({
            "selected_urls": ["<https://a.example/x>", " 'https://b.example/y'. ", ""]
        }))
        .unwrap();
        assert_eq!(urls, vec!["https://a.example/x", "https://b.example/y"]);

        let single = decode_selection(&json!({"selected_url": "https://c.example"})).unwrap();
        assert_eq!(single, vec!["https://c.example"]);

        assert!(decode_selection(&json!({"selected_url": null})).unwrap().is_empty());
        assert!(decode_selection(&json!({"selected_urls": "x"})).is_err());
    }

    #[test]
    fn summary_without_evidence_is_not_relevant() {
        assert_eq!(
            decode_summary(&json!({"relevant": false, "evidence": "x", "stance": "supports"}))
                .unwrap(),
            SummaryOutcome::NoRelevantContent
        );
        assert_eq!(
            decode_summary(&json!({"evidence": ""})).unwrap(),
            SummaryOutcome::NoRelevantContent
        );
        assert_eq!(
            decode_summary(&json!({"evidence": "Completed in 1889", "stance": "supports"}))
                .unwrap(),
            SummaryOutcome::Relevant {
                summary: "Completed in 1889".into(),
                stance: Stance::Supports
            }
        );
    }

    #[test]
    fn claims_are_trimmed_and_deduplicated() {
        let claims = decode_claims(&json!({"claims": [" A ", "B", "A", ""]})).unwrap();
        assert_eq!(claims, vec!["A", "B"]);
        assert!(decode_claims(&json!({"claim": []})).is_err());
    }
}
