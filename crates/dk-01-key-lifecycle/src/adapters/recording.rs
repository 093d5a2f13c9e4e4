//! # Recording Gateway
//!
//! A scriptable `DirectoryGateway` that records every call and can be told
//! to fail. Used by the unit and integration tests to assert the
//! exactly-once-effective gateway contract (which calls were made, how
//! many times, and that none were made on no-op or guard paths).

use crate::ports::{CreateKeyOutcome, CreatedKey, DirectoryGateway, GatewayError};
use shared_types::{ClaimId, ClaimReason, KeyRecord, KeyRecordId};
use std::sync::Mutex;

/// One recorded gateway invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateKey(KeyRecordId),
    DeleteKey(KeyRecordId),
    CloseClaim(ClaimId, ClaimReason),
    DenyClaim(ClaimId, ClaimReason),
    CancelPortability(ClaimId, ClaimReason),
    ConfirmPortability(ClaimId, ClaimReason),
}

/// Scriptable, call-recording gateway.
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    create_outcome: CreateKeyOutcome,
    assigned_value: Option<String>,
    failure: Mutex<Option<GatewayError>>,
}

impl RecordingGateway {
    /// Gateway that answers every call successfully, classifying
    /// registrations as `Own`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            create_outcome: CreateKeyOutcome::Own,
            assigned_value: None,
            failure: Mutex::new(None),
        }
    }

    /// Script the `create_key` classification.
    #[must_use]
    pub fn with_create_outcome(mut self, outcome: CreateKeyOutcome) -> Self {
        self.create_outcome = outcome;
        self
    }

    /// Script a directory-assigned value on `create_key`.
    #[must_use]
    pub fn with_assigned_value(mut self, value: impl Into<String>) -> Self {
        self.assigned_value = Some(value.into());
        self
    }

    /// Make every subsequent call fail with `error`.
    pub fn fail_with(&self, error: GatewayError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    /// Stop failing; subsequent calls succeed again.
    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Total number of calls attempted (including failed ones).
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of recorded calls matching a predicate.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|call| pred(call)).count())
            .unwrap_or(0)
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match self.failure.lock() {
            Ok(failure) => match failure.as_ref() {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryGateway for RecordingGateway {
    fn create_key(&self, record: &KeyRecord) -> Result<CreatedKey, GatewayError> {
        self.record(GatewayCall::CreateKey(record.id))?;
        Ok(CreatedKey {
            outcome: self.create_outcome,
            value: self.assigned_value.clone(),
        })
    }

    fn delete_key(&self, record: &KeyRecord) -> Result<(), GatewayError> {
        self.record(GatewayCall::DeleteKey(record.id))
    }

    fn close_claim(&self, claim: ClaimId, reason: ClaimReason) -> Result<(), GatewayError> {
        self.record(GatewayCall::CloseClaim(claim, reason))
    }

    fn deny_claim(&self, claim: ClaimId, reason: ClaimReason) -> Result<(), GatewayError> {
        self.record(GatewayCall::DenyClaim(claim, reason))
    }

    fn cancel_portability_claim(
        &self,
        claim: ClaimId,
        reason: ClaimReason,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::CancelPortability(claim, reason))
    }

    fn confirm_portability_claim(
        &self,
        claim: ClaimId,
        reason: ClaimReason,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::ConfirmPortability(claim, reason))
    }
}
