//! # Orchestration Handlers
//!
//! One handler method per triggering event. Each invocation:
//!
//! 1. re-reads the record (and claim, when the state requires one) from
//!    the stores — the trigger's embedded state is never trusted;
//! 2. invokes the matching `KeyStateMachine` operation;
//! 3. on success, persists the decided record/claim/counterpart states in
//!    one commit and then emits the decided events;
//! 4. on a transient gateway failure inside the decision, persists nothing
//!    and routes the original trigger to the dead-letter channel.
//!
//! Handlers may run concurrently across record ids but must be serialized
//! per record id; the transport provides that guarantee (single consumer
//! loop in-process, single-partition-per-key ordering in a broker).

use crate::domain::{ConflictResolver, Decision, KeyStateMachine, LifecycleError};
use crate::ports::{ClaimStore, DirectoryGateway, KeyRecordStore};
use shared_bus::{DirectoryEvent, EventPublisher, RETRY_CHANNEL};
use shared_types::{Claim, ClaimReason, KeyEventPayload, KeyRecord, KeyState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a handler invocation did, for acknowledgment decisions upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// A transition committed; the record is now in `state`.
    Applied { state: KeyState },
    /// State-guarded idempotence: nothing to do, nothing written.
    NoOp,
    /// A transient gateway failure; the trigger went to the retry channel
    /// and no state was written.
    DeadLettered,
}

/// The key-lifecycle orchestrator.
pub struct LifecycleHandler {
    records: Arc<dyn KeyRecordStore>,
    claims: Arc<dyn ClaimStore>,
    resolver: ConflictResolver,
    machine: KeyStateMachine,
    publisher: Arc<dyn EventPublisher>,
    retry_channel: String,
}

impl LifecycleHandler {
    /// Wire a handler over its four collaborators.
    #[must_use]
    pub fn new(
        records: Arc<dyn KeyRecordStore>,
        claims: Arc<dyn ClaimStore>,
        gateway: Arc<dyn DirectoryGateway>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            resolver: ConflictResolver::new(records.clone()),
            machine: KeyStateMachine::new(gateway),
            records,
            claims,
            publisher,
            retry_channel: RETRY_CHANNEL.to_owned(),
        }
    }

    /// Override the dead-letter channel name.
    #[must_use]
    pub fn with_retry_channel(mut self, channel: impl Into<String>) -> Self {
        self.retry_channel = channel.into();
        self
    }

    /// Dispatch an inbound trigger to its handler. Outcome events and
    /// dead-letter wrappers are not triggers and fall through as no-ops.
    pub async fn handle(&self, event: &DirectoryEvent) -> Result<HandlerOutcome, LifecycleError> {
        match event {
            DirectoryEvent::KeyConfirmed(p) => self.handle_confirm(p).await,
            DirectoryEvent::ClaimClosing(p) => self.handle_claim_closing(p).await,
            DirectoryEvent::ClaimDenied(p) => self.handle_claim_denied(p).await,
            DirectoryEvent::PortabilityCancelRequested { value, reason } => {
                self.handle_portability_cancel_process(value, *reason).await
            }
            DirectoryEvent::PortabilityRequestCancelOpened(p) => {
                self.handle_portability_request_cancel_opened(p).await
            }
            DirectoryEvent::PortabilityRequestConfirmOpened(p) => {
                self.handle_portability_request_confirm_opened(p).await
            }
            DirectoryEvent::PortabilityRequestCancelStarted(p) => {
                self.handle_portability_request_cancel_started(p).await
            }
            DirectoryEvent::PortabilityRequestConfirmStarted(p) => {
                self.handle_portability_request_confirm_started(p).await
            }
            _ => Ok(HandlerOutcome::NoOp),
        }
    }

    /// `KeyConfirmed`: register the key or enter an ownership flow.
    pub async fn handle_confirm(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        let counterpart = self.find_counterpart(&record)?;

        let decision = match self.machine.confirm(record, counterpart) {
            Ok(decision) => decision,
            Err(e) if e.is_retryable() => {
                return Ok(self
                    .dead_letter(DirectoryEvent::KeyConfirmed(payload.clone()))
                    .await)
            }
            Err(e) => return Err(e),
        };
        self.commit("confirm", decision).await
    }

    /// `ClaimClosing`: close an accepted inbound claim.
    pub async fn handle_claim_closing(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        if record.state != KeyState::ClaimClosing {
            return Err(LifecycleError::InvalidState {
                operation: "claim_closing",
                record: record.id,
                actual: record.state,
            });
        }
        let claim = self.resolve_claim(&record)?;
        let counterpart = self.find_counterpart(&record)?;
        let reason = reason_of(payload);

        let decision = match self.machine.claim_closing(record, claim, counterpart, reason) {
            Ok(decision) => decision,
            Err(e) if e.is_retryable() => {
                return Ok(self
                    .dead_letter(DirectoryEvent::ClaimClosing(payload.clone()))
                    .await)
            }
            Err(e) => return Err(e),
        };
        self.commit("claim_closing", decision).await
    }

    /// `ClaimDenied`: the owner kept the key.
    pub async fn handle_claim_denied(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        let reason = reason_of(payload);

        // Resolve the claim only on the live path; a replayed denial finds
        // the record already in Ready and must stay a pure no-op.
        let (claim, counterpart) = if record.state == KeyState::ClaimDenied {
            (Some(self.resolve_claim(&record)?), self.find_counterpart(&record)?)
        } else {
            (None, None)
        };

        let decision = match self.machine.claim_denied(record, claim, counterpart, reason) {
            Ok(decision) => decision,
            Err(e) if e.is_retryable() => {
                return Ok(self
                    .dead_letter(DirectoryEvent::ClaimDenied(payload.clone()))
                    .await)
            }
            Err(e) => return Err(e),
        };
        self.commit("claim_denied", decision).await
    }

    /// Administrative portability cancel, addressed by key value.
    pub async fn handle_portability_cancel_process(
        &self,
        value: &str,
        reason: ClaimReason,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let mut candidates = self
            .records
            .get_by_value_excluding_states(value, &[KeyState::Canceled])?;

        let record = match candidates.len() {
            0 => return Err(LifecycleError::ValueNotFound(value.to_owned())),
            1 => candidates.remove(0),
            n => {
                return Err(LifecycleError::Consistency(format!(
                    "{n} records share value {value:?} outside the canceled state"
                )))
            }
        };

        let claim = match record.state {
            KeyState::PortabilityStarted | KeyState::PortabilityConfirmed => {
                Some(self.resolve_claim(&record)?)
            }
            _ => None,
        };

        let decision = self
            .machine
            .portability_cancel_process(record, claim, reason)?;
        self.commit("portability_cancel_process", decision).await
    }

    /// `PortabilityRequestCancelOpened`: forward the cancel to the directory.
    pub async fn handle_portability_request_cancel_opened(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        if record.state != KeyState::PortabilityRequestCancelOpened {
            // Replay of an opening already processed.
            debug!(record = %record.id, state = ?record.state, "cancel_opened replay ignored");
            return Ok(HandlerOutcome::NoOp);
        }
        let claim = self.resolve_claim(&record)?;
        let reason = reason_of(payload);

        let decision =
            match self
                .machine
                .portability_request_cancel_opened(record, &claim, reason)
            {
                Ok(decision) => decision,
                Err(e) if e.is_retryable() => {
                    return Ok(self
                        .dead_letter(DirectoryEvent::PortabilityRequestCancelOpened(
                            payload.clone(),
                        ))
                        .await)
                }
                Err(e) => return Err(e),
            };
        self.commit("portability_request_cancel_opened", decision)
            .await
    }

    /// `PortabilityRequestConfirmOpened`: forward the confirm to the directory.
    pub async fn handle_portability_request_confirm_opened(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        if record.state != KeyState::PortabilityRequestConfirmOpened {
            debug!(record = %record.id, state = ?record.state, "confirm_opened replay ignored");
            return Ok(HandlerOutcome::NoOp);
        }
        let claim = self.resolve_claim(&record)?;
        let reason = reason_of(payload);

        let decision =
            match self
                .machine
                .portability_request_confirm_opened(record, &claim, reason)
            {
                Ok(decision) => decision,
                Err(e) if e.is_retryable() => {
                    return Ok(self
                        .dead_letter(DirectoryEvent::PortabilityRequestConfirmOpened(
                            payload.clone(),
                        ))
                        .await)
                }
                Err(e) => return Err(e),
            };
        self.commit("portability_request_confirm_opened", decision)
            .await
    }

    /// `PortabilityRequestCancelStarted`: the key stays; back to `Ready`.
    pub async fn handle_portability_request_cancel_started(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        if record.state != KeyState::PortabilityRequestCancelStarted {
            debug!(record = %record.id, state = ?record.state, "cancel_started replay ignored");
            return Ok(HandlerOutcome::NoOp);
        }
        let claim = self.resolve_claim(&record)?;

        let decision = self.machine.portability_request_cancel_started(record, claim)?;
        self.commit("portability_request_cancel_started", decision)
            .await
    }

    /// `PortabilityRequestConfirmStarted`: the key was donated; terminal
    /// `Canceled`.
    pub async fn handle_portability_request_confirm_started(
        &self,
        payload: &KeyEventPayload,
    ) -> Result<HandlerOutcome, LifecycleError> {
        let record = self.load_record(payload.id)?;
        if record.state != KeyState::PortabilityRequestConfirmStarted {
            debug!(record = %record.id, state = ?record.state, "confirm_started replay ignored");
            return Ok(HandlerOutcome::NoOp);
        }
        let claim = self.resolve_claim(&record)?;

        let decision = self
            .machine
            .portability_request_confirm_started(record, claim)?;
        self.commit("portability_request_confirm_started", decision)
            .await
    }

    // ------------------------------------------------------------------
    // shared plumbing
    // ------------------------------------------------------------------

    fn load_record(&self, id: shared_types::KeyRecordId) -> Result<KeyRecord, LifecycleError> {
        self.records
            .get_by_id(id)?
            .ok_or(LifecycleError::RecordNotFound(id))
    }

    /// Resolve the record's weak claim reference, enforcing the
    /// claim/record value agreement.
    fn resolve_claim(&self, record: &KeyRecord) -> Result<Claim, LifecycleError> {
        let claim_id = record
            .claim_ref
            .ok_or(LifecycleError::MissingClaimRef(record.id))?;
        let claim = self
            .claims
            .get_by_id(claim_id)?
            .ok_or(LifecycleError::ClaimNotFound(claim_id))?;

        if let Some(value) = &record.value {
            if claim.key_value != *value {
                return Err(LifecycleError::Consistency(format!(
                    "claim {claim_id} is for value {:?} but record {} holds {value:?}",
                    claim.key_value, record.id
                )));
            }
        }
        Ok(claim)
    }

    fn find_counterpart(
        &self,
        record: &KeyRecord,
    ) -> Result<Option<KeyRecord>, LifecycleError> {
        match &record.value {
            Some(value) => self.resolver.find_counterpart(value, record.id),
            None => Ok(None),
        }
    }

    /// Persist a decision and emit its events. A no-op decision writes and
    /// emits nothing.
    async fn commit(
        &self,
        operation: &'static str,
        decision: Decision,
    ) -> Result<HandlerOutcome, LifecycleError> {
        if decision.is_noop() {
            debug!(operation, record = %decision.record.id, "no-op");
            return Ok(HandlerOutcome::NoOp);
        }

        let state = decision.record.state;
        match &decision.counterpart {
            Some(counterpart) => {
                // The P2P branch advances both sides or neither.
                self.records
                    .update_many(&[decision.record.clone(), counterpart.clone()])?;
            }
            None => self.records.update(&decision.record)?,
        }
        if let Some(claim) = &decision.claim {
            self.claims.update(claim)?;
        }

        for event in decision.events {
            self.publisher.publish(event).await;
        }

        info!(operation, record = %decision.record.id, state = ?state, "transition committed");
        Ok(HandlerOutcome::Applied { state })
    }

    async fn dead_letter(&self, trigger: DirectoryEvent) -> HandlerOutcome {
        warn!(record = ?trigger.record_id(), channel = %self.retry_channel, "gateway unavailable, trigger dead-lettered");
        self.publisher
            .dead_letter(trigger, &self.retry_channel)
            .await;
        HandlerOutcome::DeadLettered
    }
}

fn reason_of(payload: &KeyEventPayload) -> ClaimReason {
    payload.reason.unwrap_or(ClaimReason::DefaultOperation)
}
