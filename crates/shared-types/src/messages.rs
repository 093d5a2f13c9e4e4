//! # Cross-Subsystem Message Payloads
//!
//! Inbound trigger payloads as delivered by the directory-sync adapter.
//!
//! The `state` field reflects what the *sender* believed at emission time.
//! Handlers never branch on it directly: they re-read the store and decide
//! from the persisted state (state-guarded idempotence), so duplicate and
//! out-of-order delivery degrade to no-ops instead of corrupting records.

use crate::entities::{AccountId, ClaimReason, KeyRecordId, KeyState};
use serde::{Deserialize, Serialize};

/// Payload common to the key lifecycle trigger events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEventPayload {
    /// The key record this event concerns.
    pub id: KeyRecordId,
    /// The owning account, for downstream routing.
    pub owner: AccountId,
    /// Sender-side view of the record state. Informational only.
    pub state: KeyState,
    /// Termination reason, where the trigger carries one.
    pub reason: Option<ClaimReason>,
}

impl KeyEventPayload {
    /// Payload for a record, taking the state snapshot from the record itself.
    #[must_use]
    pub fn new(id: KeyRecordId, owner: AccountId, state: KeyState) -> Self {
        Self {
            id,
            owner,
            state,
            reason: None,
        }
    }

    /// Attach a termination reason.
    #[must_use]
    pub fn with_reason(mut self, reason: ClaimReason) -> Self {
        self.reason = Some(reason);
        self
    }
}
