//! Statement-level verdict from per-claim verdicts.
//!
//! Priority is fixed: any `REFUTED` claim makes the statement
//! `CONTAINS_REFUTED`; otherwise any `UNSUPPORTED` claim makes it
//! `CONTAINS_UNSUPPORTED`; otherwise (including no claims at all) it is
//! `SUPPORTED`. The result depends only on which verdicts occur.

use serde::{Deserialize, Serialize};

use crate::model::{ClaimReport, StatementVerdict, Verdict};

pub fn aggregate<'a, I>(verdicts: I) -> StatementVerdict
where
    I: IntoIterator<Item = &'a Verdict>,
{
    let mut has_unsupported = false;
    for verdict in verdicts {
        match verdict {
            Verdict::Refuted => return StatementVerdict::ContainsRefuted,
            Verdict::Unsupported => has_unsupported = true,
            Verdict::Supported => {}
        }
    }
    if has_unsupported {
        StatementVerdict::ContainsUnsupported
    } else {
        StatementVerdict::Supported
    }
}

/// Statement verdict plus per-verdict counts for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub verdict: StatementVerdict,
    pub supported: usize,
    pub refuted: usize,
    pub unsupported: usize,
    pub reasoning: String,
}

impl AggregationSummary {
    pub fn from_verdicts<'a, I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = &'a Verdict>,
    {
        let verdicts: Vec<Verdict> = verdicts.into_iter().copied().collect();
        let count = |wanted: Verdict| verdicts.iter().filter(|v| **v == wanted).count();
        let verdict = aggregate(&verdicts);
        let (supported, refuted, unsupported) = (
            count(Verdict::Supported),
            count(Verdict::Refuted),
            count(Verdict::Unsupported),
        );
        let total = verdicts.len();
        let reasoning = match verdict {
            StatementVerdict::ContainsRefuted => {
                format!("{refuted} of {total} claims refuted by evidence")
            }
            StatementVerdict::ContainsUnsupported => {
                format!("{unsupported} of {total} claims could not be supported within budget")
            }
            StatementVerdict::Supported if total == 0 => {
                "no checkable claims in statement".to_string()
            }
            StatementVerdict::Supported => format!("all {total} claims supported"),
        };
        Self {
            verdict,
            supported,
            refuted,
            unsupported,
            reasoning,
        }
    }

    pub fn from_reports(reports: &[ClaimReport]) -> Self {
        Self::from_verdicts(reports.iter().map(|r| &r.verdict))
    }

    pub fn total(&self) -> usize {
        self.supported + self.refuted + self.unsupported
    }
}
