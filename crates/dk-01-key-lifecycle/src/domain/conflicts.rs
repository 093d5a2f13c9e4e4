//! # Conflict Resolver
//!
//! Finds the *other* local record currently sharing a key value — the
//! peer-to-peer counterpart of a transfer. Value uniqueness among live
//! records is an invariant; finding more than one counterpart is a
//! data-integrity violation and is surfaced as a fatal consistency error,
//! never silently picked from.

use crate::domain::errors::LifecycleError;
use crate::ports::KeyRecordStore;
use shared_types::{KeyRecord, KeyRecordId};
use std::sync::Arc;

/// Counterpart lookup over the key record store.
#[derive(Clone)]
pub struct ConflictResolver {
    records: Arc<dyn KeyRecordStore>,
}

impl ConflictResolver {
    /// Create a resolver over a record store.
    #[must_use]
    pub fn new(records: Arc<dyn KeyRecordStore>) -> Self {
        Self { records }
    }

    /// Find the counterpart of `exclude` for `value`.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` - no other live record holds the value
    /// - `Ok(Some(record))` - exactly one counterpart
    /// - `Err(Consistency)` - more than one live record holds the value
    pub fn find_counterpart(
        &self,
        value: &str,
        exclude: KeyRecordId,
    ) -> Result<Option<KeyRecord>, LifecycleError> {
        let mut live: Vec<KeyRecord> = self
            .records
            .get_by_value(value)?
            .into_iter()
            .filter(|r| r.id != exclude && r.state.is_live())
            .collect();

        match live.len() {
            0 => Ok(None),
            1 => Ok(live.pop()),
            n => Err(LifecycleError::Consistency(format!(
                "{n} live records share value {value:?}; expected at most one counterpart"
            ))),
        }
    }
}
