//! DispatchEngine - sequential, throttled, retrying sender

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    CanonicalRecord, ContractError, DeliveryStatus, DispatchConfig, OutboundMessage, RecipientId,
    Transport,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::DispatchError;
use crate::ledger::DeliveryLedger;
use crate::metrics::DispatchMetrics;
use crate::pacer::{Pacer, PauseKind, TokioPacer};
use crate::template::MessageTemplates;

/// Final outcome for one candidate in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Delivered and recorded SENT
    Sent,
    /// Attempts exhausted, recorded FAILED
    Failed,
    /// Unusable identity, recorded FAILED without a transport call
    ValidationError,
    /// Ledger already had SENT
    AlreadySent,
    /// Ledger already had FAILED
    PreviouslyFailed,
    /// Not processed in this batch; stays PENDING
    Deferred,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::ValidationError => "validation_error",
            Self::AlreadySent => "already_sent",
            Self::PreviouslyFailed => "previously_failed",
            Self::Deferred => "deferred",
        }
    }

    pub fn is_skip(self) -> bool {
        matches!(self, Self::AlreadySent | Self::PreviouslyFailed)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AlreadySent => "already sent",
            Self::PreviouslyFailed => "previously failed",
            Self::ValidationError => "validation error",
            other => other.as_str(),
        };
        f.write_str(label)
    }
}

/// Why a batch stopped before the end of its candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Daily quota reached
    QuotaExhausted,
    /// `max_batch` attempted candidates reached
    BatchLimit,
    /// Shutdown requested
    Interrupted,
}

/// Per-candidate record in a batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientOutcome {
    pub identity: RecipientId,
    pub kind: OutcomeKind,
    /// Transport calls made in this batch
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientOutcome {
    fn new(identity: &RecipientId, kind: OutcomeKind) -> Self {
        Self {
            identity: identity.clone(),
            kind,
            attempts: 0,
            variant: None,
            error: None,
        }
    }
}

/// Result of one `run_batch`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Candidates handed to the transport
    pub attempted: usize,
    pub succeeded: usize,
    /// Exhausted attempts plus validation errors
    pub failed: usize,
    /// Already SENT or FAILED in the ledger
    pub skipped: usize,
    /// Left PENDING because the batch stopped
    pub deferred: usize,
    pub partial: bool,
    pub stop_reason: Option<StopReason>,
    /// Ledger writes that failed during the batch
    pub persistence_failures: usize,
    /// One entry per candidate, in input order
    pub outcomes: Vec<RecipientOutcome>,
}

impl BatchResult {
    /// Number of outcomes of `kind`
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes.iter().filter(|o| o.kind == kind).count()
    }

    fn push(&mut self, outcome: RecipientOutcome) {
        observability::record_send_outcome(outcome.kind.as_str());
        match outcome.kind {
            OutcomeKind::Sent => self.succeeded += 1,
            OutcomeKind::Failed | OutcomeKind::ValidationError => self.failed += 1,
            OutcomeKind::AlreadySent | OutcomeKind::PreviouslyFailed => self.skipped += 1,
            OutcomeKind::Deferred => self.deferred += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Mark the batch partial and defer every remaining candidate
    fn stop(&mut self, reason: StopReason, remaining: &[CanonicalRecord]) {
        self.partial = true;
        self.stop_reason = Some(reason);
        for candidate in remaining {
            self.push(RecipientOutcome::new(
                &candidate.identity,
                OutcomeKind::Deferred,
            ));
        }
    }
}

/// How the retry loop for one recipient ended
enum Delivery {
    Sent { attempts: u32 },
    Exhausted { attempts: u32, error: String },
    Interrupted { attempts: u32, error: String },
}

/// Dispatch engine
///
/// Owns the ledger for the duration of its life. Candidates are processed
/// strictly one at a time so the throttle and the quota hold.
pub struct DispatchEngine<T, P = TokioPacer> {
    ledger: DeliveryLedger,
    transport: T,
    pacer: P,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
    templates: MessageTemplates,
    /// Round-robin template index, reset per engine
    variant_cursor: usize,
    shutdown: Option<watch::Receiver<bool>>,
    metrics: Arc<DispatchMetrics>,
}

impl<T: Transport> DispatchEngine<T, TokioPacer> {
    /// Engine sleeping on the tokio timer and reading the system date
    ///
    /// `config.max_per_day` becomes the ledger's daily limit.
    pub fn new(
        mut ledger: DeliveryLedger,
        transport: T,
        config: DispatchConfig,
        templates: MessageTemplates,
    ) -> Self {
        ledger.set_limit(config.max_per_day);
        Self {
            ledger,
            transport,
            pacer: TokioPacer,
            clock: Arc::new(SystemClock),
            config,
            templates,
            variant_cursor: 0,
            shutdown: None,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }
}

impl<T: Transport, P: Pacer> DispatchEngine<T, P> {
    /// Replace the pacer
    pub fn with_pacer<Q: Pacer>(self, pacer: Q) -> DispatchEngine<T, Q> {
        DispatchEngine {
            ledger: self.ledger,
            transport: self.transport,
            pacer,
            clock: self.clock,
            config: self.config,
            templates: self.templates,
            variant_cursor: self.variant_cursor,
            shutdown: self.shutdown,
            metrics: self.metrics,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Observe `true` on this channel as a shutdown request
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DeliveryLedger {
        &mut self.ledger
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    /// Close the transport and flush the ledger, returning it
    ///
    /// A failed flush is logged and counted; the returned ledger still holds
    /// every outcome of the run.
    pub async fn finish(mut self) -> DeliveryLedger {
        if let Err(e) = self.transport.close().await {
            warn!(transport = %self.transport.name(), error = %e, "transport close failed");
        }
        if let Err(e) = self.ledger.flush() {
            self.metrics.inc_persist_failures();
            warn!(error = %e, "final ledger flush failed, outcomes kept in memory");
        }
        self.ledger
    }

    /// Process `candidates` in order
    ///
    /// `max_batch` caps the number of attempted candidates. The batch stops
    /// early on quota exhaustion, the cap, or a shutdown request; every
    /// unprocessed candidate is reported `Deferred`.
    #[instrument(
        name = "dispatch_run_batch",
        skip(self, candidates),
        fields(candidates = candidates.len(), max_batch = ?max_batch)
    )]
    pub async fn run_batch(
        &mut self,
        candidates: &[CanonicalRecord],
        max_batch: Option<usize>,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        info!(
            transport = %self.transport.name(),
            max_attempts = self.config.max_attempts,
            "dispatch batch started"
        );

        for (idx, candidate) in candidates.iter().enumerate() {
            if self.shutdown_requested() {
                info!(processed = idx, "shutdown requested, stopping batch");
                result.stop(StopReason::Interrupted, &candidates[idx..]);
                break;
            }

            let identity = &candidate.identity;
            let skip = match self.ledger.status(identity) {
                DeliveryStatus::Sent => Some(OutcomeKind::AlreadySent),
                DeliveryStatus::Failed => Some(OutcomeKind::PreviouslyFailed),
                DeliveryStatus::Pending => None,
            };
            if let Some(kind) = skip {
                debug!(identity = %identity, reason = %kind, "candidate skipped");
                self.metrics.inc_skipped();
                result.push(RecipientOutcome::new(identity, kind));
                continue;
            }

            let quota = self.ledger.current_quota(self.clock.today());
            if quota.is_exhausted() {
                info!(count = quota.count, limit = quota.limit, "daily quota reached");
                result.stop(StopReason::QuotaExhausted, &candidates[idx..]);
                break;
            }

            if max_batch.is_some_and(|cap| result.attempted >= cap) {
                info!(attempted = result.attempted, "batch limit reached");
                result.stop(StopReason::BatchLimit, &candidates[idx..]);
                break;
            }

            if let Err(err) = RecipientId::parse(identity.as_str()) {
                let outcome = self.reject(identity, err.to_string(), &mut result);
                result.push(outcome);
                continue;
            }

            let variant = self.variant_cursor;
            let message = self.templates.render(variant, candidate);
            result.attempted += 1;

            let delivery = self.deliver(&message).await;
            let outcome = self.settle(identity, variant, delivery, &mut result);
            let interrupted = outcome.kind == OutcomeKind::Deferred;
            result.push(outcome);

            self.variant_cursor = (self.variant_cursor + 1) % self.templates.len();

            let remaining = &candidates[idx + 1..];
            if interrupted {
                result.stop(StopReason::Interrupted, remaining);
                break;
            }
            if !remaining.is_empty()
                && !self
                    .pause(PauseKind::Throttle, self.config.per_message_delay())
                    .await
            {
                info!("shutdown requested during throttle");
                result.stop(StopReason::Interrupted, remaining);
                break;
            }
        }

        info!(
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            deferred = result.deferred,
            stop_reason = ?result.stop_reason,
            "dispatch batch finished"
        );
        result
    }

    /// Record a validation failure without touching the transport
    fn reject(
        &mut self,
        identity: &RecipientId,
        reason: String,
        result: &mut BatchResult,
    ) -> RecipientOutcome {
        let error = DispatchError::validation(identity.as_str(), reason).to_string();
        warn!(identity = %identity, error = %error, "candidate rejected");
        self.metrics.inc_failed();

        if !identity.as_str().trim().is_empty() {
            self.record(
                identity,
                DeliveryStatus::Failed,
                0,
                Some(error.clone()),
                None,
                result,
            );
        }

        RecipientOutcome {
            error: Some(error),
            ..RecipientOutcome::new(identity, OutcomeKind::ValidationError)
        }
    }

    /// Bounded retry loop for one message
    async fn deliver(&mut self, message: &OutboundMessage) -> Delivery {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.metrics.inc_attempts();
            observability::record_send_attempt(self.transport.name());

            let error = match self.transport.send(message).await {
                Ok(receipt) if receipt.success => {
                    debug!(
                        identity = %message.recipient,
                        attempt,
                        receipt = ?receipt.id,
                        "delivery accepted"
                    );
                    return Delivery::Sent { attempts: attempt };
                }
                Ok(_) => "transport rejected the message".to_string(),
                Err(err) => transport_message(err),
            };

            warn!(
                identity = %message.recipient,
                attempt,
                max_attempts,
                error = %error,
                "delivery attempt failed"
            );

            let error = DispatchError::transport(self.transport.name(), error).to_string();
            if attempt >= max_attempts {
                return Delivery::Exhausted {
                    attempts: attempt,
                    error,
                };
            }

            if !self
                .pause(PauseKind::Backoff, self.config.backoff_for(attempt))
                .await
            {
                return Delivery::Interrupted {
                    attempts: attempt,
                    error,
                };
            }
        }
    }

    /// Apply a delivery result to the ledger and quota
    fn settle(
        &mut self,
        identity: &RecipientId,
        variant: usize,
        delivery: Delivery,
        result: &mut BatchResult,
    ) -> RecipientOutcome {
        let mut outcome = RecipientOutcome {
            variant: Some(variant),
            ..RecipientOutcome::new(identity, OutcomeKind::Sent)
        };

        match delivery {
            Delivery::Sent { attempts } => {
                if let Err(e) = self.ledger.increment_quota(self.clock.today()) {
                    warn!(identity = %identity, error = %e, "sent past the daily quota");
                }
                self.metrics.inc_sent();
                self.record(
                    identity,
                    DeliveryStatus::Sent,
                    attempts,
                    None,
                    Some(variant),
                    result,
                );
                info!(identity = %identity, attempts, variant, "recipient sent");
                outcome.attempts = attempts;
            }
            Delivery::Exhausted { attempts, error } => {
                self.metrics.inc_failed();
                self.record(
                    identity,
                    DeliveryStatus::Failed,
                    attempts,
                    Some(error.clone()),
                    Some(variant),
                    result,
                );
                warn!(identity = %identity, attempts, error = %error, "recipient failed");
                outcome.kind = OutcomeKind::Failed;
                outcome.attempts = attempts;
                outcome.error = Some(error);
            }
            Delivery::Interrupted { attempts, error } => {
                outcome.kind = OutcomeKind::Deferred;
                outcome.attempts = attempts;
                outcome.error = Some(error);
            }
        }
        outcome
    }

    fn record(
        &mut self,
        identity: &RecipientId,
        status: DeliveryStatus,
        attempts: u32,
        error: Option<String>,
        variant: Option<usize>,
        result: &mut BatchResult,
    ) {
        match self
            .ledger
            .record_outcome(identity, status, attempts, error, variant)
        {
            Ok(()) => {}
            Err(e) if e.is_persistence() => {
                self.metrics.inc_persist_failures();
                result.persistence_failures += 1;
            }
            Err(e) => warn!(identity = %identity, error = %e, "ledger rejected outcome"),
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Pause via the pacer; false when shutdown was requested
    async fn pause(&self, kind: PauseKind, duration: Duration) -> bool {
        let Some(mut shutdown) = self.shutdown.clone() else {
            self.pacer.pause(kind, duration).await;
            return true;
        };
        if *shutdown.borrow() {
            return false;
        }

        let pause = self.pacer.pause(kind, duration);
        tokio::pin!(pause);

        let stopped = tokio::select! {
            _ = &mut pause => None,
            stopped = wait_for_shutdown(&mut shutdown) => Some(stopped),
        };

        match stopped {
            None => !*shutdown.borrow(),
            Some(true) => false,
            // Sender gone; no shutdown can arrive any more
            Some(false) => {
                pause.await;
                true
            }
        }
    }
}

/// Resolves true once shutdown is flagged, false if the sender is dropped
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) -> bool {
    shutdown.wait_for(|stop| *stop).await.is_ok()
}

fn transport_message(err: ContractError) -> String {
    match err {
        ContractError::Transport { message, .. } => message,
        other => other.to_string(),
    }
}
