use std::fmt::Write as _;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregationSummary;
use crate::model::{ClaimReport, RoundStatus, StatementVerdict, VisitStatus};

/// Audit artifact of one statement-verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckReport {
    pub run_id: Uuid,
    pub statement: String,
    pub created_at: DateTime<Utc>,
    pub claims: Vec<ClaimReport>,
    pub summary: AggregationSummary,
}

impl FactCheckReport {
    pub fn new(statement: impl Into<String>, claims: Vec<ClaimReport>) -> Self {
        let summary = AggregationSummary::from_reports(&claims);
        Self {
            run_id: Uuid::new_v4(),
            statement: statement.into(),
            created_at: Utc::now(),
            claims,
            summary,
        }
    }

    pub fn verdict(&self) -> StatementVerdict {
        self.summary.verdict
    }

    pub fn render_markdown(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "## Fact check: {}", self.verdict());
        let _ = writeln!(output, "> {}\n", self.statement);
        let _ = writeln!(output, "{}\n", self.summary.reasoning);

        if self.claims.is_empty() {
            output.push_str("No claims extracted.\n");
            return output;
        }

        for (idx, report) in self.claims.iter().enumerate() {
            let _ = writeln!(
                output,
                "### {}. {} ({})",
                idx + 1,
                report.claim,
                report.verdict
            );
            let _ = writeln!(
                output,
                "- rounds used: {} ({})",
                report.rounds_used,
                report.reason.as_str()
            );
            for round in &report.rounds {
                let _ = writeln!(
                    output,
                    "- round {} `{}`: {}",
                    round.round,
                    round.query,
                    describe_round(&round.status)
                );
                for visit in &round.visits {
                    let _ = writeln!(
                        output,
                        "  - {} {}",
                        visit.url,
                        describe_visit(&visit.status)
                    );
                }
            }
            if report.evidence.is_empty() {
                output.push_str("- no evidence gathered\n");
            }
            for item in &report.evidence {
                let _ = writeln!(
                    output,
                    "- [{}] {} ({})",
                    item.stance.as_str(),
                    item.summary,
                    item.source_url
                );
            }
            output.push('\n');
        }
        output
    }
}

fn describe_round(status: &RoundStatus) -> String {
    match status {
        RoundStatus::SearchFailed { reason } => format!("search failed: {reason}"),
        other => other.as_str().replace('_', " "),
    }
}

fn describe_visit(status: &VisitStatus) -> String {
    match status {
        VisitStatus::FetchFailed { reason } | VisitStatus::SummaryFailed { reason } => {
            format!("({}: {reason})", status.as_str())
        }
        other => format!("({})", other.as_str()),
    }
}

/// Write `report` as pretty JSON to `<dir>/<run_id>.json`.
pub fn persist_report<P: AsRef<Path>>(dir: P, report: &FactCheckReport) -> Result<PathBuf> {
    let dir = dir.as_ref();
    create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;
    let path = dir.join(format!("{}.json", report.run_id));
    let payload = serde_json::to_vec_pretty(report)?;
    let mut file = File::create(&path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    file.write_all(&payload)
        .with_context(|| format!("failed to write report file {}", path.display()))?;
    Ok(path)
}
