use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use factcheck_agents::build_fact_checker;
use factcheck_core::{
    AggregationSummary, CancelHandle, CancelSignal, ClaimReport, Config, ConfigLoader,
    EventCollector, EventLog, FactChecker, TelemetryOptions, Verdict, VerificationEvent,
    init_metrics_from_env, init_telemetry, persist_report,
};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "factcheck",
    version,
    about = "Verify statements against web evidence"
)]
struct Cli {
    /// Configuration file (defaults to $FACTCHECK_CONFIG, then ./factcheck.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the claims in a statement and verify each one.
    Check(CheckArgs),
    /// Verify a single claim as given.
    VerifyClaim(VerifyClaimArgs),
    /// Combine claim verdicts into a statement verdict without any lookups.
    Aggregate(AggregateArgs),
}

#[derive(Args, Debug)]
struct RunFlags {
    /// Research rounds allowed per claim (overrides the config file).
    #[arg(long)]
    round_budget: Option<usize>,

    /// Print JSON instead of a readable report.
    #[arg(long)]
    json: bool,

    /// Log judge decisions and research rounds as they happen.
    #[arg(long)]
    progress: bool,

    /// Write every verification event to this JSON file when the run ends.
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Statement to fact check.
    #[arg(long)]
    statement: String,

    /// Directory to write the JSON audit report into.
    #[arg(long)]
    report_dir: Option<PathBuf>,

    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args, Debug)]
struct VerifyClaimArgs {
    /// Claim to verify.
    #[arg(long)]
    claim: String,

    #[command(flatten)]
    flags: RunFlags,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Claim verdicts, repeatable.
    #[arg(long = "verdict", value_enum)]
    verdicts: Vec<VerdictArg>,

    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VerdictArg {
    Supported,
    Refuted,
    Unsupported,
}

impl From<VerdictArg> for Verdict {
    fn from(value: VerdictArg) -> Self {
        match value {
            VerdictArg::Supported => Verdict::Supported,
            VerdictArg::Refuted => Verdict::Refuted,
            VerdictArg::Unsupported => Verdict::Unsupported,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::load_or_default(cli.config.clone())?;

    init_telemetry(TelemetryOptions::from_logging(&config.logging))?;
    init_metrics_from_env("factcheck-cli");

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Check(args) => check_command(config, args).await?,
            Command::VerifyClaim(args) => verify_claim_command(config, args).await?,
            Command::Aggregate(args) => aggregate_command(args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

/// Checker plus the task gathering its events, when any were requested.
struct Prepared {
    checker: FactChecker,
    events: Option<JoinHandle<EventLog>>,
}

impl Prepared {
    /// Drop the checker so the event stream closes, then persist the log.
    async fn finish(self, flags: &RunFlags) -> Result<()> {
        let Prepared { checker, events } = self;
        drop(checker);
        let (Some(task), Some(path)) = (events, &flags.events) else {
            return Ok(());
        };
        let log = task.await.context("event log task failed")?;
        std::fs::write(path, log.to_json()?)
            .with_context(|| format!("writing events to {}", path.display()))?;
        info!(path = %path.display(), events = log.events().len(), "event log written");
        Ok(())
    }
}

/// Build the checker, applying command-line overrides and optional event capture.
fn prepare(mut config: Config, flags: &RunFlags) -> Result<Prepared> {
    if let Some(budget) = flags.round_budget {
        config.verification.round_budget = budget;
        ConfigLoader::validate(&config)?;
    }
    let checker = build_fact_checker(&config)?;
    if !flags.progress && flags.events.is_none() {
        return Ok(Prepared {
            checker,
            events: None,
        });
    }

    let (collector, receiver) = EventCollector::new();
    let progress = flags.progress;
    let events = tokio::spawn(async move {
        let mut log = EventLog::new(receiver);
        log.follow(|event| {
            if progress {
                log_progress(event);
            }
        })
        .await;
        log
    });
    let verifier = checker.verifier().clone().with_events(collector);
    Ok(Prepared {
        checker: checker.with_verifier(verifier),
        events: Some(events),
    })
}

/// Ctrl+C cancels the run; in-flight rounds stop and claims end unsupported.
fn cancel_on_ctrl_c() -> CancelSignal {
    let (handle, signal) = CancelHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling verification");
            handle.cancel();
        }
    });
    signal
}

fn log_progress(event: &VerificationEvent) {
    match event {
        VerificationEvent::ClaimStarted { claim, round_budget, .. } => {
            info!(%claim, round_budget, "verifying claim");
        }
        VerificationEvent::DecisionMade { claim, decision, .. } => {
            info!(%claim, ?decision, "judge decided");
        }
        VerificationEvent::RoundCompleted {
            claim,
            round,
            query,
            status,
            pages_fetched,
            evidence_added,
            ..
        } => {
            info!(
                %claim,
                round,
                %query,
                status = status.as_str(),
                pages_fetched,
                evidence_added,
                "research round finished"
            );
        }
        VerificationEvent::ClaimFinished {
            claim,
            verdict,
            duration_ms,
            ..
        } => {
            info!(%claim, %verdict, duration_ms, "claim finished");
        }
    }
}

async fn check_command(config: Config, args: CheckArgs) -> Result<()> {
    info!(statement = %args.statement, "starting fact check");
    let prepared = prepare(config, &args.flags)?;
    let cancel = cancel_on_ctrl_c();

    let outcome = prepared
        .checker
        .check_with_cancel(&args.statement, cancel)
        .await;
    prepared.finish(&args.flags).await?;
    let report = outcome.context("fact check failed")?;

    if let Some(dir) = &args.report_dir {
        let path = persist_report(dir, &report)?;
        info!(path = %path.display(), "audit report written");
    }

    if args.flags.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render_markdown());
    }
    Ok(())
}

async fn verify_claim_command(config: Config, args: VerifyClaimArgs) -> Result<()> {
    let prepared = prepare(config, &args.flags)?;
    let cancel = cancel_on_ctrl_c();
    let report = prepared.checker.verify_claim(args.claim, &cancel).await;
    prepared.finish(&args.flags).await?;

    if args.flags.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_claim(&report);
    }
    Ok(())
}

fn print_claim(report: &ClaimReport) {
    println!("{}: {}", report.verdict, report.claim);
    println!(
        "rounds used: {} ({})",
        report.rounds_used,
        report.reason.as_str()
    );
    for query in report.search_history() {
        println!("  searched: {query}");
    }
    for item in &report.evidence {
        println!(
            "  [{}] {} ({})",
            item.stance.as_str(),
            item.summary,
            item.source_url
        );
    }
}

fn aggregate_command(args: AggregateArgs) -> Result<()> {
    let verdicts: Vec<Verdict> = args.verdicts.into_iter().map(Verdict::from).collect();
    let summary = AggregationSummary::from_verdicts(&verdicts);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}: {}", summary.verdict, summary.reasoning);
    }
    Ok(())
}
