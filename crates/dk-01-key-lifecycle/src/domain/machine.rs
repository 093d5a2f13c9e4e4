//! # Key State Machine
//!
//! Pure decision logic for the key lifecycle. Given the current record,
//! its claim and counterpart (when relevant) and the triggering event,
//! each operation decides the next state, the gateway calls to make, and
//! the events to emit — packed into a [`Decision`] the orchestration
//! handler commits atomically.
//!
//! Every operation matches `KeyState` exhaustively: adding a state forces
//! every transition table here to be revisited at compile time.
//!
//! ## Failure Contract
//!
//! Gateway calls happen before any entity is mutated. A failed call
//! surfaces as `LifecycleError::Gateway` with the decision abandoned, so
//! the caller observes no partial state change and can dead-letter the
//! trigger.

use crate::domain::errors::LifecycleError;
use crate::ports::{CreateKeyOutcome, DirectoryGateway};
use shared_bus::DirectoryEvent;
use shared_types::{Claim, ClaimReason, ClaimStatus, KeyEventPayload, KeyRecord, KeyState};
use std::sync::Arc;
use tracing::debug;

/// The outcome of a state-machine operation.
///
/// Entities inside already carry their next states. The handler persists
/// `record` (and `counterpart`/`claim` when present) in one commit, then
/// emits `events`.
#[derive(Debug, Clone)]
pub struct Decision {
    /// The triggering record with its next state applied.
    pub record: KeyRecord,
    /// The P2P counterpart with its next state applied, when the decision
    /// touches one.
    pub counterpart: Option<KeyRecord>,
    /// The associated claim with its terminated status, when the decision
    /// touches one.
    pub claim: Option<Claim>,
    /// Outcome events to emit after the commit.
    pub events: Vec<DirectoryEvent>,
}

impl Decision {
    /// A decision that changes nothing and emits nothing. Used for the
    /// state-guarded idempotence short-circuits.
    #[must_use]
    pub fn noop(record: KeyRecord) -> Self {
        Self {
            record,
            counterpart: None,
            claim: None,
            events: Vec::new(),
        }
    }

    /// Whether this decision is an idempotent no-op.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.events.is_empty() && self.counterpart.is_none() && self.claim.is_none()
    }
}

fn payload_for(record: &KeyRecord) -> KeyEventPayload {
    KeyEventPayload::new(record.id, record.owner, record.state)
}

/// The key-state state machine.
///
/// Holds only the directory gateway; stores and the event bus stay with
/// the orchestration handlers.
#[derive(Clone)]
pub struct KeyStateMachine {
    gateway: Arc<dyn DirectoryGateway>,
}

impl KeyStateMachine {
    /// Create a machine over a directory gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn DirectoryGateway>) -> Self {
        Self { gateway }
    }

    /// Handle `KeyConfirmed`: register the key, or enter an ownership flow
    /// when the value is already held.
    ///
    /// The counterpart probe wins over the gateway: when another live local
    /// record holds the value, no directory call is made at all (P2P path).
    pub fn confirm(
        &self,
        record: KeyRecord,
        counterpart: Option<KeyRecord>,
    ) -> Result<Decision, LifecycleError> {
        match record.state {
            KeyState::Confirmed => {}
            actual => {
                return Err(LifecycleError::InvalidState {
                    operation: "confirm",
                    record: record.id,
                    actual,
                })
            }
        }

        if let Some(counterpart) = counterpart {
            // P2P path: both sides of the value are local records.
            let next = if counterpart.state.is_counterpart_ready() {
                KeyState::OwnershipPending
            } else {
                KeyState::OwnershipConflict
            };
            let record = record.with_state(next);
            let event = match next {
                KeyState::OwnershipPending => DirectoryEvent::OwnershipPending(payload_for(&record)),
                _ => DirectoryEvent::OwnershipConflict(payload_for(&record)),
            };
            debug!(record = %record.id, counterpart = %counterpart.id, next = ?next, "Confirm resolved against local counterpart");
            return Ok(Decision {
                record,
                counterpart: None,
                claim: None,
                events: vec![event],
            });
        }

        let created = self.gateway.create_key(&record)?;

        let mut record = record;
        if record.value.is_none() {
            // Token keys receive their value from the directory.
            record.value = created.value;
        }

        let (next, event_for): (KeyState, fn(KeyEventPayload) -> DirectoryEvent) =
            match created.outcome {
                CreateKeyOutcome::Own => (KeyState::AddKeyReady, DirectoryEvent::KeyReady),
                CreateKeyOutcome::Portability => {
                    (KeyState::PortabilityPending, DirectoryEvent::PortabilityPending)
                }
                CreateKeyOutcome::ThirdParty => {
                    (KeyState::OwnershipPending, DirectoryEvent::OwnershipPending)
                }
            };

        let record = record.with_state(next);
        let events = vec![event_for(payload_for(&record))];
        Ok(Decision {
            record,
            counterpart: None,
            claim: None,
            events,
        })
    }

    /// Handle `ClaimClosing`: close an accepted inbound claim, transferring
    /// the key to the claimant.
    ///
    /// With a local counterpart in `OwnershipWaiting` the transfer is
    /// resolved peer-to-peer: the directory registration is moved with one
    /// `delete_key` and one `create_key`, and both records advance together.
    /// Otherwise the claim is closed at the directory (PSP branch).
    pub fn claim_closing(
        &self,
        record: KeyRecord,
        claim: Claim,
        counterpart: Option<KeyRecord>,
        reason: ClaimReason,
    ) -> Result<Decision, LifecycleError> {
        match record.state {
            KeyState::ClaimClosing => {}
            actual => {
                return Err(LifecycleError::InvalidState {
                    operation: "claim_closing",
                    record: record.id,
                    actual,
                })
            }
        }

        match counterpart {
            Some(counterpart) if counterpart.state == KeyState::OwnershipWaiting => {
                // P2P branch: move the directory registration across the
                // two local records, then advance both.
                self.gateway.delete_key(&counterpart)?;
                self.gateway.create_key(&record)?;

                let counterpart = counterpart.with_state(KeyState::OwnershipReady);
                let record = record.with_state(KeyState::ClaimClosed);
                let claim = claim.terminated(ClaimStatus::Closed, Some(reason));
                let events = vec![
                    DirectoryEvent::OwnershipReady(payload_for(&counterpart)),
                    DirectoryEvent::ClaimClosed(
                        payload_for(&record).with_reason(reason),
                    ),
                ];
                Ok(Decision {
                    record,
                    counterpart: Some(counterpart),
                    claim: Some(claim),
                    events,
                })
            }
            _ => {
                // PSP branch: the claimant is a remote participant.
                self.gateway.close_claim(claim.id, reason)?;

                let record = record.with_state(KeyState::ClaimClosed);
                let claim = claim.terminated(ClaimStatus::Closed, Some(reason));
                let events = vec![DirectoryEvent::ClaimClosed(
                    payload_for(&record).with_reason(reason),
                )];
                Ok(Decision {
                    record,
                    counterpart: None,
                    claim: Some(claim),
                    events,
                })
            }
        }
    }

    /// Handle `ClaimDenied`: the owner kept the key; the claim ends.
    ///
    /// A record already back in `Ready` is a replay: no gateway call, no
    /// event, record returned as-is.
    pub fn claim_denied(
        &self,
        record: KeyRecord,
        claim: Option<Claim>,
        counterpart: Option<KeyRecord>,
        reason: ClaimReason,
    ) -> Result<Decision, LifecycleError> {
        match record.state {
            // Idempotence short-circuit for replayed denials.
            KeyState::Ready => return Ok(Decision::noop(record)),
            KeyState::ClaimDenied => {}
            actual => {
                return Err(LifecycleError::InvalidState {
                    operation: "claim_denied",
                    record: record.id,
                    actual,
                })
            }
        }

        let claim = claim.ok_or(LifecycleError::MissingClaimRef(record.id))?;

        match counterpart {
            Some(counterpart) if counterpart.state == KeyState::OwnershipWaiting => {
                // P2P branch: the claimant is local; no directory involved.
                let counterpart = counterpart.with_state(KeyState::OwnershipCanceled);
                let record = record.with_state(KeyState::Ready);
                let claim = claim.terminated(ClaimStatus::Denied, Some(reason));
                let events = vec![
                    DirectoryEvent::OwnershipCanceled(
                        payload_for(&counterpart).with_reason(reason),
                    ),
                    DirectoryEvent::KeyReady(payload_for(&record)),
                ];
                Ok(Decision {
                    record,
                    counterpart: Some(counterpart),
                    claim: Some(claim),
                    events,
                })
            }
            _ => {
                self.gateway.deny_claim(claim.id, reason)?;

                let record = record.with_state(KeyState::Ready);
                let claim = claim.terminated(ClaimStatus::Denied, Some(reason));
                let events = vec![DirectoryEvent::KeyReady(payload_for(&record))];
                Ok(Decision {
                    record,
                    counterpart: None,
                    claim: Some(claim),
                    events,
                })
            }
        }
    }

    /// Handle the administrative portability cancel, addressed by value.
    ///
    /// The caller resolves the record with the `Canceled` state excluded so
    /// a repeated cancel finds the already-canceled portability and answers
    /// idempotently.
    pub fn portability_cancel_process(
        &self,
        record: KeyRecord,
        claim: Option<Claim>,
        reason: ClaimReason,
    ) -> Result<Decision, LifecycleError> {
        match record.state {
            // Repeat of an already-processed cancel.
            KeyState::PortabilityCanceled => Ok(Decision::noop(record)),
            KeyState::PortabilityStarted | KeyState::PortabilityConfirmed => {
                let claim = claim.ok_or(LifecycleError::MissingClaimRef(record.id))?;
                let record = record.with_state(KeyState::PortabilityCanceled);
                let claim = claim.terminated(ClaimStatus::Canceled, Some(reason));
                let events = vec![DirectoryEvent::PortabilityCanceled(
                    payload_for(&record).with_reason(reason),
                )];
                Ok(Decision {
                    record,
                    counterpart: None,
                    claim: Some(claim),
                    events,
                })
            }
            actual => Err(LifecycleError::InvalidState {
                operation: "portability_cancel_process",
                record: record.id,
                actual,
            }),
        }
    }

    /// Handle `PortabilityRequestCancelOpened`: ask the directory to cancel
    /// the portability claim.
    ///
    /// Wrong starting state is a silent no-op (replay of an already
    /// processed opening), not an error.
    pub fn portability_request_cancel_opened(
        &self,
        record: KeyRecord,
        claim: &Claim,
        reason: ClaimReason,
    ) -> Result<Decision, LifecycleError> {
        if record.state != KeyState::PortabilityRequestCancelOpened {
            return Ok(Decision::noop(record));
        }

        self.gateway.cancel_portability_claim(claim.id, reason)?;

        let record = record.with_state(KeyState::PortabilityRequestCancelStarted);
        let events = vec![DirectoryEvent::PortabilityCancelStarted(
            payload_for(&record).with_reason(reason),
        )];
        Ok(Decision {
            record,
            counterpart: None,
            claim: None,
            events,
        })
    }

    /// Handle `PortabilityRequestConfirmOpened`: ask the directory to
    /// confirm the portability claim. Same replay contract as the cancel
    /// opening.
    pub fn portability_request_confirm_opened(
        &self,
        record: KeyRecord,
        claim: &Claim,
        reason: ClaimReason,
    ) -> Result<Decision, LifecycleError> {
        if record.state != KeyState::PortabilityRequestConfirmOpened {
            return Ok(Decision::noop(record));
        }

        self.gateway.confirm_portability_claim(claim.id, reason)?;

        let record = record.with_state(KeyState::PortabilityRequestConfirmStarted);
        let events = vec![DirectoryEvent::PortabilityConfirmStarted(
            payload_for(&record).with_reason(reason),
        )];
        Ok(Decision {
            record,
            counterpart: None,
            claim: None,
            events,
        })
    }

    /// Handle `PortabilityRequestCancelStarted`: the directory accepted the
    /// cancel; the key stays with this record.
    pub fn portability_request_cancel_started(
        &self,
        record: KeyRecord,
        claim: Claim,
    ) -> Result<Decision, LifecycleError> {
        if record.state != KeyState::PortabilityRequestCancelStarted {
            return Ok(Decision::noop(record));
        }

        let record = record.with_state(KeyState::Ready);
        let claim = claim.terminated(ClaimStatus::Canceled, None);
        let events = vec![DirectoryEvent::KeyReady(payload_for(&record))];
        Ok(Decision {
            record,
            counterpart: None,
            claim: Some(claim),
            events,
        })
    }

    /// Handle `PortabilityRequestConfirmStarted`: the directory accepted
    /// the confirm; this record is the losing side and ends `Canceled`.
    ///
    /// The confirm→CANCELED direction is the observed production behavior
    /// and is kept as-is: the record seeing this notification donated its
    /// key to the gaining participant.
    pub fn portability_request_confirm_started(
        &self,
        record: KeyRecord,
        claim: Claim,
    ) -> Result<Decision, LifecycleError> {
        if record.state != KeyState::PortabilityRequestConfirmStarted {
            return Ok(Decision::noop(record));
        }

        let record = record.with_state(KeyState::Canceled);
        let claim = claim.terminated(ClaimStatus::Confirmed, None);
        let events = vec![DirectoryEvent::KeyCanceled(payload_for(&record))];
        Ok(Decision {
            record,
            counterpart: None,
            claim: Some(claim),
            events,
        })
    }
}
