use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

struct VerificationMetrics {
    rounds: Counter<u64>,
    visits: Counter<u64>,
    verdicts: Counter<u64>,
    claim_duration_ms: Histogram<f64>,
}

static METRICS: OnceCell<VerificationMetrics> = OnceCell::new();

fn handles() -> &'static VerificationMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("factcheck.verification");
        VerificationMetrics {
            rounds: meter
                .u64_counter("factcheck_research_rounds_total")
                .with_description("Research rounds by terminal round status")
                .init(),
            visits: meter
                .u64_counter("factcheck_page_visits_total")
                .with_description("Page visits by outcome")
                .init(),
            verdicts: meter
                .u64_counter("factcheck_claim_verdicts_total")
                .with_description("Claim verdicts by verdict and termination reason")
                .init(),
            claim_duration_ms: meter
                .f64_histogram("factcheck_claim_duration_ms")
                .with_description("Wall-clock time to verify a single claim")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) {
    if std::env::var("FACTCHECK_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target = "telemetry",
            "FACTCHECK_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export verification metrics."
        );
    }
}

pub(crate) fn record_round(status: &'static str) {
    handles()
        .rounds
        .add(1, &[KeyValue::new("status", status)]);
}

pub(crate) fn record_visit(status: &'static str) {
    handles()
        .visits
        .add(1, &[KeyValue::new("status", status)]);
}

pub(crate) fn record_claim(verdict: &'static str, reason: &'static str, duration_ms: u64) {
    let metrics = handles();
    let attrs = [
        KeyValue::new("verdict", verdict),
        KeyValue::new("reason", reason),
    ];
    metrics.verdicts.add(1, &attrs);
    metrics.claim_duration_ms.record(duration_ms as f64, &attrs);
}
