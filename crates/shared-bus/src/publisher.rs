//! # Event Publisher
//!
//! Defines the publishing side of the event bus, including the dead-letter
//! re-publish primitive used by the orchestration handlers when an external
//! gateway call fails transiently.

use crate::events::{DirectoryEvent, EventFilter};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing events to the bus.
///
/// At-least-once delivery: a published event reaches every live subscriber,
/// and consumers tolerate duplicates through state-guarded idempotence.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: DirectoryEvent) -> usize;

    /// Route a failed trigger to a dead-letter channel for bounded retry.
    ///
    /// The trigger is wrapped unmodified, so a retry consumer can re-publish
    /// it verbatim and the handler will re-attempt the same decision against
    /// whatever state is then persisted.
    async fn dead_letter(&self, trigger: DirectoryEvent, channel: &str) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;

    /// Get the total number of triggers dead-lettered.
    fn events_dead_lettered(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics. Suitable for single-node operation; distributed deployments
/// would back this with a partitioned broker keeping per-key ordering.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<DirectoryEvent>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Total triggers dead-lettered.
    events_dead_lettered: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            events_dead_lettered: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Returns a `Subscription` handle that can be used to receive events.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}", filter.topics);

        // Track subscription
        {
            if let Ok(mut subs) = self.subscriptions.write() {
                *subs.entry(topic_key.clone()).or_insert(0) += 1;
            }
        }

        debug!(topics = ?filter.topics, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key)
    }

    /// Get a stream of events matching a filter.
    ///
    /// This is a convenience method that returns an `EventStream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn send(&self, event: DirectoryEvent) -> usize {
        let topic = event.topic();

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(topic = ?topic, receivers = receiver_count, "Event published");
                receiver_count
            }
            Err(e) => {
                // No receivers - event is dropped
                warn!(topic = ?topic, error = %e, "Event dropped (no receivers)");
                0
            }
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: DirectoryEvent) -> usize {
        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.send(event)
    }

    async fn dead_letter(&self, trigger: DirectoryEvent, channel: &str) -> usize {
        self.events_dead_lettered.fetch_add(1, Ordering::Relaxed);
        warn!(channel, record = ?trigger.record_id(), "Trigger dead-lettered");
        self.send(DirectoryEvent::RetryRequested {
            channel: channel.to_owned(),
            trigger: Box::new(trigger),
        })
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    fn events_dead_lettered(&self) -> u64 {
        self.events_dead_lettered.load(Ordering::Relaxed)
    }
}
