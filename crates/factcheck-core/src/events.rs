//! Event bus for claim-loop audit trails.
//!
//! Claim loops emit lifecycle events through an [`EventCollector`]; callers that
//! want a live view drain the receiving side with an [`EventLog`].

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::judge::JudgeDecision;
use crate::model::{Claim, RoundStatus, TerminationReason, Verdict};

pub type EventId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationEvent {
    ClaimStarted {
        event_id: EventId,
        timestamp: u64,
        claim: Claim,
        round_budget: usize,
    },
    /// The judge produced a decision after `rounds_used` rounds.
    DecisionMade {
        event_id: EventId,
        timestamp: u64,
        claim: Claim,
        rounds_used: usize,
        decision: JudgeDecision,
    },
    RoundCompleted {
        event_id: EventId,
        timestamp: u64,
        claim: Claim,
        round: usize,
        query: String,
        status: RoundStatus,
        pages_fetched: usize,
        evidence_added: usize,
    },
    ClaimFinished {
        event_id: EventId,
        timestamp: u64,
        claim: Claim,
        verdict: Verdict,
        reason: TerminationReason,
        rounds_used: usize,
        duration_ms: u64,
    },
}

impl VerificationEvent {
    pub fn event_id(&self) -> &str {
        match self {
            VerificationEvent::ClaimStarted { event_id, .. }
            | VerificationEvent::DecisionMade { event_id, .. }
            | VerificationEvent::RoundCompleted { event_id, .. }
            | VerificationEvent::ClaimFinished { event_id, .. } => event_id,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            VerificationEvent::ClaimStarted { timestamp, .. }
            | VerificationEvent::DecisionMade { timestamp, .. }
            | VerificationEvent::RoundCompleted { timestamp, .. }
            | VerificationEvent::ClaimFinished { timestamp, .. } => *timestamp,
        }
    }

    pub fn claim(&self) -> &Claim {
        match self {
            VerificationEvent::ClaimStarted { claim, .. }
            | VerificationEvent::DecisionMade { claim, .. }
            | VerificationEvent::RoundCompleted { claim, .. }
            | VerificationEvent::ClaimFinished { claim, .. } => claim,
        }
    }
}

/// Sending side of the event bus; cheap to clone into every claim worker.
#[derive(Clone)]
pub struct EventCollector {
    sender: mpsc::UnboundedSender<VerificationEvent>,
}

impl EventCollector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<VerificationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit_claim_started(&self, claim: &Claim, round_budget: usize) {
        self.send(VerificationEvent::ClaimStarted {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            claim: claim.clone(),
            round_budget,
        });
    }

    pub fn emit_decision(&self, claim: &Claim, rounds_used: usize, decision: &JudgeDecision) {
        self.send(VerificationEvent::DecisionMade {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            claim: claim.clone(),
            rounds_used,
            decision: decision.clone(),
        });
    }

    pub fn emit_round(&self, claim: &Claim, round: &crate::model::SearchRound) {
        self.send(VerificationEvent::RoundCompleted {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            claim: claim.clone(),
            round: round.round,
            query: round.query.clone(),
            status: round.status.clone(),
            pages_fetched: round.fetch_attempts(),
            evidence_added: round.evidence_added,
        });
    }

    pub fn emit_claim_finished(
        &self,
        claim: &Claim,
        verdict: Verdict,
        reason: TerminationReason,
        rounds_used: usize,
        duration_ms: u64,
    ) {
        self.send(VerificationEvent::ClaimFinished {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            claim: claim.clone(),
            verdict,
            reason,
            rounds_used,
            duration_ms,
        });
    }

    fn send(&self, event: VerificationEvent) {
        // A dropped receiver only means nobody is listening.
        if self.sender.send(event).is_err() {
            tracing::trace!("event receiver dropped; discarding event");
        }
    }
}

fn generate_event_id() -> EventId {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("evt_{id}")
}

/// Unix timestamp in milliseconds.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Receiving side that buffers everything emitted until the senders close.
pub struct EventLog {
    receiver: mpsc::UnboundedReceiver<VerificationEvent>,
    events: Vec<VerificationEvent>,
}

impl EventLog {
    pub fn new(receiver: mpsc::UnboundedReceiver<VerificationEvent>) -> Self {
        Self {
            receiver,
            events: Vec::new(),
        }
    }

    /// Collect until every [`EventCollector`] clone has been dropped.
    pub async fn collect(&mut self) {
        while let Some(event) = self.receiver.recv().await {
            tracing::trace!(event_id = %event.event_id(), "collected event");
            self.events.push(event);
        }
    }

    /// Like [`EventLog::collect`], handing each event to `on_event` as it arrives.
    pub async fn follow(&mut self, mut on_event: impl FnMut(&VerificationEvent)) {
        while let Some(event) = self.receiver.recv().await {
            on_event(&event);
            self.events.push(event);
        }
    }

    /// Take whatever is already queued without waiting.
    pub fn drain_ready(&mut self) -> &[VerificationEvent] {
        while let Ok(event) = self.receiver.try_recv() {
            self.events.push(event);
        }
        &self.events
    }

    pub fn events(&self) -> &[VerificationEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<VerificationEvent> {
        self.events
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }
}
