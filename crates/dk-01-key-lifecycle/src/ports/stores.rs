//! # Store Ports
//!
//! Persistence abstractions for key records and claims. The backing
//! technology is an external concern; the subsystem only depends on these
//! point lookups and updates.

use shared_types::{Claim, ClaimId, KeyRecord, KeyRecordId, KeyState};
use thiserror::Error;

/// Errors from the persistence backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Key record persistence.
pub trait KeyRecordStore: Send + Sync {
    /// Point lookup by record id.
    fn get_by_id(&self, id: KeyRecordId) -> Result<Option<KeyRecord>, StoreError>;

    /// All records carrying a value, regardless of state. Callers apply
    /// their own liveness filtering and multiplicity checks.
    fn get_by_value(&self, value: &str) -> Result<Vec<KeyRecord>, StoreError>;

    /// Records carrying a value, excluding the given states. Used by the
    /// administrative portability cancel, which must still see
    /// `PortabilityCanceled` records to answer idempotently.
    fn get_by_value_excluding_states(
        &self,
        value: &str,
        excluded: &[KeyState],
    ) -> Result<Vec<KeyRecord>, StoreError>;

    /// Persist a single record.
    fn update(&self, record: &KeyRecord) -> Result<(), StoreError>;

    /// Persist several records in one atomic commit. The P2P branch writes
    /// both sides of a transfer through this; a partial write is a
    /// contract violation of the implementation.
    fn update_many(&self, records: &[KeyRecord]) -> Result<(), StoreError>;
}

/// Claim persistence.
pub trait ClaimStore: Send + Sync {
    /// Point lookup by claim id.
    fn get_by_id(&self, id: ClaimId) -> Result<Option<Claim>, StoreError>;

    /// Persist a claim.
    fn update(&self, claim: &Claim) -> Result<(), StoreError>;
}
