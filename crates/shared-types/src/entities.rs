//! # Core Domain Entities
//!
//! Defines the directory-key entities shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Key**: `KeyRecord`, `KeyRecordId`, `KeyType`, `KeyState`
//! - **Claim**: `Claim`, `ClaimId`, `ClaimType`, `ClaimStatus`, `ClaimReason`
//! - **Accounts**: `AccountId`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier of a key record. Immutable for the record's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRecordId(pub Uuid);

impl KeyRecordId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for KeyRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to the settlement account that owns a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// CLUSTER A: THE KEY
// =============================================================================

/// The kind of identifier a key binds to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// A phone number in E.164 form.
    Phone,
    /// An e-mail address.
    Email,
    /// A national document number.
    Document,
    /// An opaque random token; its value is assigned by the directory.
    Token,
}

/// Lifecycle state of a key record.
///
/// This is a closed enum: decision functions match it exhaustively so that
/// adding a state forces every transition table to be revisited.
///
/// ```text
/// PENDING → CONFIRMED → {ADD_KEY_READY | PORTABILITY_PENDING |
///                        OWNERSHIP_PENDING | OWNERSHIP_CONFLICT}
/// OWNERSHIP_PENDING → OWNERSHIP_WAITING → {OWNERSHIP_READY | OWNERSHIP_CANCELED}
/// CLAIM_PENDING → CLAIM_CLOSING → CLAIM_CLOSED
/// CLAIM_PENDING → CLAIM_DENIED → READY
/// PORTABILITY_REQUEST_CANCEL_OPENED  → _STARTED → READY
/// PORTABILITY_REQUEST_CONFIRM_OPENED → _STARTED → CANCELED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    /// Registered locally, awaiting user confirmation.
    Pending,
    /// Confirmed by the user, not yet registered with the directory.
    Confirmed,
    /// Registered with the directory as a brand-new key.
    AddKeyReady,
    /// Fully active key.
    Ready,
    /// The directory reported the value as portable from another participant.
    PortabilityPending,
    /// A portability claim for this key has been started.
    PortabilityStarted,
    /// The donor participant confirmed the portability claim.
    PortabilityConfirmed,
    /// The portability process was canceled.
    PortabilityCanceled,
    /// The directory reported the value as owned by a third party.
    OwnershipPending,
    /// An ownership claim has been opened; waiting on the current owner.
    OwnershipWaiting,
    /// The ownership claim completed in this record's favor.
    OwnershipReady,
    /// The ownership claim was canceled.
    OwnershipCanceled,
    /// A local counterpart held the value in a non-transferable state.
    OwnershipConflict,
    /// A claim against this key was opened by another participant.
    ClaimPending,
    /// The owner accepted; the claim is being closed in the claimant's favor.
    ClaimClosing,
    /// The claim closed; this record lost the key.
    ClaimClosed,
    /// The owner denied the claim.
    ClaimDenied,
    /// A request to cancel an inbound portability was opened.
    PortabilityRequestCancelOpened,
    /// The cancel request was accepted by the directory.
    PortabilityRequestCancelStarted,
    /// A request to confirm an inbound portability was opened.
    PortabilityRequestConfirmOpened,
    /// The confirm request was accepted by the directory.
    PortabilityRequestConfirmStarted,
    /// Terminal: the key was removed from the directory.
    Deleted,
    /// Terminal: the record was canceled locally.
    Canceled,
    /// Terminal: manual intervention required.
    Error,
}

impl KeyState {
    /// Terminal states. Records are never physically deleted; these are
    /// the soft end-of-life markers.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted | Self::Canceled | Self::Error)
    }

    /// States in which a record still occupies its key value. Counterpart
    /// lookups and value-uniqueness checks only consider live records.
    #[must_use]
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Deleted | Self::Canceled)
    }

    /// Whether a counterpart in this state can be the target of an
    /// ownership claim (the P2P transfer entry condition).
    #[must_use]
    pub fn is_counterpart_ready(self) -> bool {
        matches!(self, Self::AddKeyReady | Self::Ready)
    }

    /// Membership in the claim-related state group. Any transition that
    /// leaves this group must also terminate the associated claim's status.
    #[must_use]
    pub fn is_claim_related(self) -> bool {
        matches!(
            self,
            Self::ClaimPending
                | Self::ClaimClosing
                | Self::ClaimClosed
                | Self::ClaimDenied
                | Self::OwnershipPending
                | Self::OwnershipWaiting
                | Self::OwnershipReady
                | Self::OwnershipCanceled
                | Self::OwnershipConflict
                | Self::PortabilityPending
                | Self::PortabilityStarted
                | Self::PortabilityConfirmed
                | Self::PortabilityCanceled
                | Self::PortabilityRequestCancelOpened
                | Self::PortabilityRequestCancelStarted
                | Self::PortabilityRequestConfirmOpened
                | Self::PortabilityRequestConfirmStarted
        )
    }
}

/// A registered directory key: the binding of an identifier to a
/// settlement account.
///
/// `value` stays `None` for token keys until the directory assigns one.
/// `claim_ref` is a weak, foreign-key-style reference; resolving it is an
/// explicit store fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Immutable record identifier.
    pub id: KeyRecordId,
    /// The identifier value; unique among live records.
    pub value: Option<String>,
    /// The kind of identifier.
    pub key_type: KeyType,
    /// Owning settlement account. Immutable after creation.
    pub owner: AccountId,
    /// Current lifecycle state.
    pub state: KeyState,
    /// Weak reference to the active claim, when one exists.
    pub claim_ref: Option<ClaimId>,
}

impl KeyRecord {
    /// Create a record in the provisional `Pending` state.
    #[must_use]
    pub fn new(key_type: KeyType, value: Option<String>, owner: AccountId) -> Self {
        Self {
            id: KeyRecordId::random(),
            value,
            key_type,
            owner,
            state: KeyState::Pending,
            claim_ref: None,
        }
    }

    /// Copy of this record with a new state.
    #[must_use]
    pub fn with_state(mut self, state: KeyState) -> Self {
        self.state = state;
        self
    }

    /// Copy of this record pointing at a claim.
    #[must_use]
    pub fn with_claim_ref(mut self, claim: ClaimId) -> Self {
        self.claim_ref = Some(claim);
        self
    }
}

// =============================================================================
// CLUSTER B: THE CLAIM
// =============================================================================

/// The two directory-mediated transfer processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimType {
    /// The claimant asserts the key already belongs to one of its accounts.
    Ownership,
    /// The gaining participant requests the key without asserting ownership.
    Portability,
}

/// Progress of a claim. Claims are never deleted, only status-terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Open,
    Confirmed,
    Canceled,
    Closed,
    Denied,
}

/// Why a claim was canceled, denied or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimReason {
    /// The account holder asked for it.
    UserRequested,
    /// The owning settlement account was closed.
    AccountClosed,
    /// Fraud was flagged on either side.
    Fraud,
    /// Directory default when no reason is supplied.
    DefaultOperation,
    /// Reconciliation found the local record diverged from the directory.
    ReconciliationDivergence,
}

/// A pending directory-mediated process to transfer or dispute ownership
/// of a key. Created when the directory notifies that a claim has begun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Immutable claim identifier, shared with the directory.
    pub id: ClaimId,
    /// The key value under dispute. Must match the record's value.
    pub key_value: String,
    /// Ownership or portability.
    pub claim_type: ClaimType,
    /// Termination reason, once one applies.
    pub reason: Option<ClaimReason>,
    /// Current status.
    pub status: ClaimStatus,
}

impl Claim {
    /// Create an open claim for a key value.
    #[must_use]
    pub fn open(key_value: impl Into<String>, claim_type: ClaimType) -> Self {
        Self {
            id: ClaimId::random(),
            key_value: key_value.into(),
            claim_type,
            reason: None,
            status: ClaimStatus::Open,
        }
    }

    /// Copy of this claim terminated with a status and reason.
    #[must_use]
    pub fn terminated(mut self, status: ClaimStatus, reason: Option<ClaimReason>) -> Self {
        self.status = status;
        if reason.is_some() {
            self.reason = reason;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(KeyState::Deleted.is_terminal());
        assert!(KeyState::Canceled.is_terminal());
        assert!(KeyState::Error.is_terminal());
        assert!(!KeyState::Ready.is_terminal());
        assert!(!KeyState::ClaimClosed.is_terminal());
    }

    #[test]
    fn test_live_excludes_deleted_and_canceled_only() {
        assert!(!KeyState::Deleted.is_live());
        assert!(!KeyState::Canceled.is_live());
        // Error is terminal but still occupies the value.
        assert!(KeyState::Error.is_live());
        assert!(KeyState::ClaimPending.is_live());
    }

    #[test]
    fn test_counterpart_ready_group() {
        assert!(KeyState::Ready.is_counterpart_ready());
        assert!(KeyState::AddKeyReady.is_counterpart_ready());
        assert!(!KeyState::ClaimPending.is_counterpart_ready());
        assert!(!KeyState::OwnershipWaiting.is_counterpart_ready());
    }

    #[test]
    fn test_claim_related_group() {
        assert!(KeyState::ClaimClosing.is_claim_related());
        assert!(KeyState::OwnershipWaiting.is_claim_related());
        assert!(KeyState::PortabilityRequestConfirmOpened.is_claim_related());
        assert!(!KeyState::Ready.is_claim_related());
        assert!(!KeyState::Pending.is_claim_related());
        assert!(!KeyState::Canceled.is_claim_related());
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = KeyRecord::new(KeyType::Email, Some("a@b.example".into()), AccountId::random());
        assert_eq!(record.state, KeyState::Pending);
        assert!(record.claim_ref.is_none());
    }

    #[test]
    fn test_claim_terminated_keeps_existing_reason() {
        let claim = Claim {
            reason: Some(ClaimReason::Fraud),
            ..Claim::open("5511999990000", ClaimType::Ownership)
        };
        let closed = claim.terminated(ClaimStatus::Closed, None);
        assert_eq!(closed.status, ClaimStatus::Closed);
        assert_eq!(closed.reason, Some(ClaimReason::Fraud));
    }
}
