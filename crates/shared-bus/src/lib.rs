//! # Shared Bus - Event Bus for Inter-Subsystem Communication
//!
//! All communication between the directory-sync adapter, the key-lifecycle
//! subsystem and downstream consumers flows through this bus.
//!
//! ## Choreography Pattern
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │ Directory Sync   │                    │ Key Lifecycle    │
//! │ (inbound events) │    publish()       │ (dk-01)          │
//! │                  │ ──────┐            │                  │
//! └──────────────────┘       │            └──────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │          │
//!                      │              │ ─────────┘
//!                      └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery Contract
//!
//! - At-least-once toward subscribers; consumers are state-guarded
//!   idempotent, so duplicates degrade to no-ops.
//! - Triggers whose processing failed transiently are re-published to a
//!   dedicated dead-letter channel via [`EventPublisher::dead_letter`],
//!   never silently dropped.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{DirectoryEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Default dead-letter channel for triggers that failed transiently.
pub const RETRY_CHANNEL: &str = "dlq.retry";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }

    #[test]
    fn test_retry_channel_name() {
        assert_eq!(RETRY_CHANNEL, "dlq.retry");
    }
}
