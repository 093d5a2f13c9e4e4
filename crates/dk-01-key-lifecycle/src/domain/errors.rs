use crate::ports::{GatewayError, StoreError};
use shared_types::{ClaimId, KeyRecordId, KeyState};
use thiserror::Error;

/// Errors raised by the key lifecycle subsystem.
///
/// The dispatch layer decides acknowledgment from the variant:
/// `Gateway(Unavailable)` is the only retryable case (and the handlers
/// already convert it into a dead-letter); everything else is surfaced and
/// acked without retry.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("record {record} in state {actual:?} cannot handle {operation}")]
    InvalidState {
        operation: &'static str,
        record: KeyRecordId,
        actual: KeyState,
    },

    #[error("key record not found: {0}")]
    RecordNotFound(KeyRecordId),

    #[error("no live key record for value {0:?}")]
    ValueNotFound(String),

    #[error("claim not found: {0}")]
    ClaimNotFound(ClaimId),

    #[error("record {0} is in a claim state but carries no claim reference")]
    MissingClaimRef(KeyRecordId),

    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// Whether the dispatch layer may retry the triggering message.
    ///
    /// Only a transient gateway outage qualifies; invalid states, missing
    /// entities and consistency violations will fail the same way forever.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(g) if g.is_transient())
    }
}
