//! # Directory Gateway Port
//!
//! Synchronous calls against the external directory service. Every call
//! either succeeds, fails transiently (`Unavailable` — the caller routes
//! the trigger to the dead-letter channel) or fails terminally
//! (`Rejected` — a business failure, never retried).
//!
//! Implementations must enforce a bounded timeout; a timeout is reported
//! as `Unavailable`.

use shared_types::{ClaimId, ClaimReason, KeyRecord};
use thiserror::Error;

/// How the directory classified a `create_key` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKeyOutcome {
    /// The value was free; the key now belongs to this participant.
    Own,
    /// The value is registered to another participant and is portable.
    Portability,
    /// The value is registered to a third party; an ownership claim is
    /// required to take it.
    ThirdParty,
}

/// Successful `create_key` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedKey {
    /// The directory's classification of the registration.
    pub outcome: CreateKeyOutcome,
    /// Directory-assigned value, present for token keys registered
    /// without one.
    pub value: Option<String>,
}

impl CreatedKey {
    /// A plain outcome with no assigned value.
    #[must_use]
    pub fn of(outcome: CreateKeyOutcome) -> Self {
        Self {
            outcome,
            value: None,
        }
    }
}

/// Errors from directory calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transient: the directory was unreachable or timed out.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// Terminal: the directory rejected the call.
    #[error("directory rejected the call: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Whether the failed call may be retried later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Port to the external directory service.
pub trait DirectoryGateway: Send + Sync {
    /// Register a key with the directory.
    fn create_key(&self, record: &KeyRecord) -> Result<CreatedKey, GatewayError>;

    /// Remove a key registration from the directory.
    fn delete_key(&self, record: &KeyRecord) -> Result<(), GatewayError>;

    /// Close a claim in the claimant's favor.
    fn close_claim(&self, claim: ClaimId, reason: ClaimReason) -> Result<(), GatewayError>;

    /// Deny a claim.
    fn deny_claim(&self, claim: ClaimId, reason: ClaimReason) -> Result<(), GatewayError>;

    /// Ask the directory to cancel an in-flight portability claim.
    fn cancel_portability_claim(
        &self,
        claim: ClaimId,
        reason: ClaimReason,
    ) -> Result<(), GatewayError>;

    /// Ask the directory to confirm an in-flight portability claim.
    fn confirm_portability_claim(
        &self,
        claim: ClaimId,
        reason: ClaimReason,
    ) -> Result<(), GatewayError>;
}
