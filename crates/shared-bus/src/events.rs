//! # Directory Events
//!
//! Defines all event types that flow through the shared bus: the inbound
//! triggers mirrored from the external directory, the outcome events the
//! key-lifecycle subsystem emits, and the dead-letter wrapper.

use serde::{Deserialize, Serialize};
use shared_types::{ClaimReason, KeyEventPayload, KeyRecordId};

/// All events that can be published to the event bus.
///
/// Inbound triggers are produced by the directory-sync adapter (or by the
/// dead-letter re-publisher); outcome events are produced by the
/// key-lifecycle handlers after a transition commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryEvent {
    // =========================================================================
    // INBOUND TRIGGERS (directory → key lifecycle)
    // =========================================================================
    /// The user confirmed a pending key; directory registration may begin.
    KeyConfirmed(KeyEventPayload),

    /// The owner accepted an inbound claim; it must be closed in the
    /// claimant's favor.
    ClaimClosing(KeyEventPayload),

    /// The owner denied an inbound claim.
    ClaimDenied(KeyEventPayload),

    /// Administrative request to cancel an in-flight portability,
    /// addressed by key value rather than record id.
    PortabilityCancelRequested {
        /// The key value whose portability should be canceled.
        value: String,
        /// Why the portability is being canceled.
        reason: ClaimReason,
    },

    /// A request to cancel an inbound portability was opened locally.
    PortabilityRequestCancelOpened(KeyEventPayload),

    /// A request to confirm an inbound portability was opened locally.
    PortabilityRequestConfirmOpened(KeyEventPayload),

    /// The directory acknowledged the cancel request.
    PortabilityRequestCancelStarted(KeyEventPayload),

    /// The directory acknowledged the confirm request.
    PortabilityRequestConfirmStarted(KeyEventPayload),

    // =========================================================================
    // OUTCOME EVENTS (key lifecycle → downstream)
    // =========================================================================
    /// The key is active and usable for settlement addressing.
    KeyReady(KeyEventPayload),

    /// The directory reported the value as portable; a portability claim
    /// can be started against the current holder.
    PortabilityPending(KeyEventPayload),

    /// The directory (or a local counterpart) holds the value; an ownership
    /// claim is required.
    OwnershipPending(KeyEventPayload),

    /// A local counterpart held the value in a non-transferable state.
    OwnershipConflict(KeyEventPayload),

    /// The ownership claim completed in this record's favor.
    OwnershipReady(KeyEventPayload),

    /// The ownership claim was canceled.
    OwnershipCanceled(KeyEventPayload),

    /// An inbound claim was closed; this record lost the key.
    ClaimClosed(KeyEventPayload),

    /// An in-flight portability was canceled.
    PortabilityCanceled(KeyEventPayload),

    /// The portability cancel request is in progress at the directory.
    PortabilityCancelStarted(KeyEventPayload),

    /// The portability confirm request is in progress at the directory.
    PortabilityConfirmStarted(KeyEventPayload),

    /// The record reached the terminal `Canceled` state.
    KeyCanceled(KeyEventPayload),

    // =========================================================================
    // DEAD LETTER
    // =========================================================================
    /// A trigger whose processing failed transiently, re-published for
    /// bounded retry on a named channel.
    RetryRequested {
        /// The retry channel this trigger was routed to.
        channel: String,
        /// The original trigger, unmodified.
        trigger: Box<DirectoryEvent>,
    },
}

impl DirectoryEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::KeyConfirmed(_) | Self::KeyReady(_) | Self::KeyCanceled(_) => {
                EventTopic::KeyLifecycle
            }
            Self::ClaimClosing(_) | Self::ClaimDenied(_) | Self::ClaimClosed(_) => {
                EventTopic::Claims
            }
            Self::PortabilityCancelRequested { .. }
            | Self::PortabilityRequestCancelOpened(_)
            | Self::PortabilityRequestConfirmOpened(_)
            | Self::PortabilityRequestCancelStarted(_)
            | Self::PortabilityRequestConfirmStarted(_)
            | Self::PortabilityPending(_)
            | Self::PortabilityCanceled(_)
            | Self::PortabilityCancelStarted(_)
            | Self::PortabilityConfirmStarted(_) => EventTopic::Portability,
            Self::OwnershipPending(_)
            | Self::OwnershipConflict(_)
            | Self::OwnershipReady(_)
            | Self::OwnershipCanceled(_) => EventTopic::Ownership,
            Self::RetryRequested { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// The record this event concerns, when it is addressed by id.
    #[must_use]
    pub fn record_id(&self) -> Option<KeyRecordId> {
        match self {
            Self::KeyConfirmed(p)
            | Self::ClaimClosing(p)
            | Self::ClaimDenied(p)
            | Self::PortabilityRequestCancelOpened(p)
            | Self::PortabilityRequestConfirmOpened(p)
            | Self::PortabilityRequestCancelStarted(p)
            | Self::PortabilityRequestConfirmStarted(p)
            | Self::KeyReady(p)
            | Self::PortabilityPending(p)
            | Self::OwnershipPending(p)
            | Self::OwnershipConflict(p)
            | Self::OwnershipReady(p)
            | Self::OwnershipCanceled(p)
            | Self::ClaimClosed(p)
            | Self::PortabilityCanceled(p)
            | Self::PortabilityCancelStarted(p)
            | Self::PortabilityConfirmStarted(p)
            | Self::KeyCanceled(p) => Some(p.id),
            Self::PortabilityCancelRequested { .. } => None,
            Self::RetryRequested { trigger, .. } => trigger.record_id(),
        }
    }

    /// Whether this event is an inbound trigger (as opposed to an outcome
    /// event or a dead-letter wrapper).
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            Self::KeyConfirmed(_)
                | Self::ClaimClosing(_)
                | Self::ClaimDenied(_)
                | Self::PortabilityCancelRequested { .. }
                | Self::PortabilityRequestCancelOpened(_)
                | Self::PortabilityRequestConfirmOpened(_)
                | Self::PortabilityRequestCancelStarted(_)
                | Self::PortabilityRequestConfirmStarted(_)
        )
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Registration, readiness and terminal key events.
    KeyLifecycle,
    /// Inbound-claim progress events.
    Claims,
    /// Portability-process events.
    Portability,
    /// Ownership-claim events.
    Ownership,
    /// Dead-lettered triggers awaiting retry.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Restrict to specific records. Empty means all records.
    pub record_ids: Vec<KeyRecordId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            record_ids: Vec::new(),
        }
    }

    /// Create a filter for events concerning specific records.
    #[must_use]
    pub fn records(record_ids: Vec<KeyRecordId>) -> Self {
        Self {
            topics: Vec::new(),
            record_ids,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &DirectoryEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let record_match = self.record_ids.is_empty()
            || event
                .record_id()
                .is_some_and(|id| self.record_ids.contains(&id));

        topic_match && record_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AccountId, KeyState};

    fn payload() -> KeyEventPayload {
        KeyEventPayload::new(KeyRecordId::random(), AccountId::random(), KeyState::Ready)
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(
            DirectoryEvent::KeyReady(payload()).topic(),
            EventTopic::KeyLifecycle
        );
        assert_eq!(
            DirectoryEvent::ClaimClosing(payload()).topic(),
            EventTopic::Claims
        );
        assert_eq!(
            DirectoryEvent::OwnershipConflict(payload()).topic(),
            EventTopic::Ownership
        );
        assert_eq!(
            DirectoryEvent::PortabilityCancelStarted(payload()).topic(),
            EventTopic::Portability
        );
    }

    #[test]
    fn test_dead_letter_keeps_record_id() {
        let p = payload();
        let id = p.id;
        let event = DirectoryEvent::RetryRequested {
            channel: "dlq.retry".into(),
            trigger: Box::new(DirectoryEvent::ClaimClosing(p)),
        };
        assert_eq!(event.topic(), EventTopic::DeadLetterQueue);
        assert_eq!(event.record_id(), Some(id));
    }

    #[test]
    fn test_trigger_classification() {
        assert!(DirectoryEvent::KeyConfirmed(payload()).is_trigger());
        assert!(DirectoryEvent::PortabilityCancelRequested {
            value: "5511999990000".into(),
            reason: ClaimReason::UserRequested,
        }
        .is_trigger());
        assert!(!DirectoryEvent::KeyReady(payload()).is_trigger());
        assert!(!DirectoryEvent::RetryRequested {
            channel: "dlq.retry".into(),
            trigger: Box::new(DirectoryEvent::KeyConfirmed(payload())),
        }
        .is_trigger());
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&DirectoryEvent::KeyReady(payload())));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Ownership]);
        assert!(filter.matches(&DirectoryEvent::OwnershipReady(payload())));
        assert!(!filter.matches(&DirectoryEvent::KeyReady(payload())));
    }

    #[test]
    fn test_filter_by_record() {
        let p = payload();
        let filter = EventFilter::records(vec![p.id]);
        assert!(filter.matches(&DirectoryEvent::KeyReady(p)));
        assert!(!filter.matches(&DirectoryEvent::KeyReady(payload())));
    }
}
