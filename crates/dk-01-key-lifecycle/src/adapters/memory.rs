//! # In-Memory Stores
//!
//! Mutex-guarded map-backed implementations of the store ports. Suitable
//! for single-node operation and tests; production deployments plug a
//! database-backed implementation into the same traits.
//!
//! `update_many` holds the single lock across all writes, which makes the
//! multi-record commit of the P2P branch atomic by construction.

use crate::ports::{ClaimStore, KeyRecordStore, StoreError};
use shared_types::{Claim, ClaimId, KeyRecord, KeyRecordId, KeyState};
use std::collections::HashMap;
use std::sync::Mutex;

fn poisoned(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} store lock poisoned"))
}

/// In-memory key record store.
#[derive(Default)]
pub struct InMemoryKeyRecordStore {
    records: Mutex<HashMap<KeyRecordId, KeyRecord>>,
}

impl InMemoryKeyRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record. Test and bootstrap helper.
    pub fn insert(&self, record: KeyRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(record.id, record);
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyRecordStore for InMemoryKeyRecordStore {
    fn get_by_id(&self, id: KeyRecordId) -> Result<Option<KeyRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| poisoned("record"))?;
        Ok(records.get(&id).cloned())
    }

    fn get_by_value(&self, value: &str) -> Result<Vec<KeyRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| poisoned("record"))?;
        Ok(records
            .values()
            .filter(|r| r.value.as_deref() == Some(value))
            .cloned()
            .collect())
    }

    fn get_by_value_excluding_states(
        &self,
        value: &str,
        excluded: &[KeyState],
    ) -> Result<Vec<KeyRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| poisoned("record"))?;
        Ok(records
            .values()
            .filter(|r| r.value.as_deref() == Some(value) && !excluded.contains(&r.state))
            .cloned()
            .collect())
    }

    fn update(&self, record: &KeyRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| poisoned("record"))?;
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn update_many(&self, batch: &[KeyRecord]) -> Result<(), StoreError> {
        // One lock across the whole batch: all-or-nothing by construction.
        let mut records = self.records.lock().map_err(|_| poisoned("record"))?;
        for record in batch {
            records.insert(record.id, record.clone());
        }
        Ok(())
    }
}

/// In-memory claim store.
#[derive(Default)]
pub struct InMemoryClaimStore {
    claims: Mutex<HashMap<ClaimId, Claim>>,
}

impl InMemoryClaimStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a claim. Test and bootstrap helper.
    pub fn insert(&self, claim: Claim) {
        if let Ok(mut claims) = self.claims.lock() {
            claims.insert(claim.id, claim);
        }
    }
}

impl ClaimStore for InMemoryClaimStore {
    fn get_by_id(&self, id: ClaimId) -> Result<Option<Claim>, StoreError> {
        let claims = self.claims.lock().map_err(|_| poisoned("claim"))?;
        Ok(claims.get(&id).cloned())
    }

    fn update(&self, claim: &Claim) -> Result<(), StoreError> {
        let mut claims = self.claims.lock().map_err(|_| poisoned("claim"))?;
        claims.insert(claim.id, claim.clone());
        Ok(())
    }
}
