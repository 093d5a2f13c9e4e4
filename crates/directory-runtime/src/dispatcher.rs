//! # Dispatch and Retry Loops
//!
//! The dispatch loop consumes triggering events from the bus and feeds them
//! to the lifecycle handler one at a time, which serializes handling per
//! record. The retry loop consumes the dead-letter channel and re-publishes
//! failed triggers with a bounded attempt budget per record.

use dk_01_key_lifecycle::handlers::LifecycleHandler;
use shared_bus::{DirectoryEvent, EventFilter, EventPublisher, EventTopic, InMemoryEventBus};
use shared_types::KeyRecordId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Sequential consumer of triggering events.
pub struct Dispatcher {
    handler: Arc<LifecycleHandler>,
    bus: Arc<InMemoryEventBus>,
}

impl Dispatcher {
    /// Create a dispatcher over a handler and the bus it consumes from.
    #[must_use]
    pub fn new(handler: Arc<LifecycleHandler>, bus: Arc<InMemoryEventBus>) -> Self {
        Self { handler, bus }
    }

    /// Run the dispatch loop until shutdown or bus closure.
    ///
    /// Handler errors are terminal for the trigger, not for the loop: they
    /// are logged and the loop moves on. Transient gateway failures never
    /// surface here; the handler dead-letters those itself.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut sub = self.bus.subscribe(EventFilter::all());
        info!("dispatch loop started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("dispatch loop stopping");
                        break;
                    }
                }
                event = sub.recv() => {
                    let Some(event) = event else {
                        info!("event bus closed, dispatch loop exiting");
                        break;
                    };
                    if !event.is_trigger() {
                        continue;
                    }
                    match self.handler.handle(&event).await {
                        Ok(outcome) => {
                            debug!(record = ?event.record_id(), ?outcome, "trigger handled");
                        }
                        Err(e) => {
                            error!(record = ?event.record_id(), error = %e, "trigger failed");
                        }
                    }
                }
            }
        }
    }
}

/// Bounded-retry consumer of the dead-letter channel.
///
/// Dead-lettered triggers are re-published verbatim after a delay; the
/// handler then re-attempts the same decision against whatever state is
/// persisted at that point. Each record gets a fixed attempt budget, after
/// which the trigger is dropped with an error log for operator attention.
pub struct RetryWorker {
    bus: Arc<InMemoryEventBus>,
    channel: String,
    max_attempts: u32,
    delay: Duration,
    attempts: HashMap<KeyRecordId, u32>,
}

impl RetryWorker {
    /// Create a retry worker for one dead-letter channel.
    #[must_use]
    pub fn new(
        bus: Arc<InMemoryEventBus>,
        channel: impl Into<String>,
        max_attempts: u32,
        delay: Duration,
    ) -> Self {
        Self {
            bus,
            channel: channel.into(),
            max_attempts,
            delay,
            attempts: HashMap::new(),
        }
    }

    /// Run the retry loop until shutdown or bus closure.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut sub = self
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::DeadLetterQueue]));
        info!(channel = %self.channel, "retry loop started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("retry loop stopping");
                        break;
                    }
                }
                event = sub.recv() => {
                    let Some(event) = event else {
                        info!("event bus closed, retry loop exiting");
                        break;
                    };
                    let DirectoryEvent::RetryRequested { channel, trigger } = event else {
                        continue;
                    };
                    if channel != self.channel {
                        continue;
                    }
                    self.redeliver(*trigger).await;
                }
            }
        }
    }

    async fn redeliver(&mut self, trigger: DirectoryEvent) {
        let attempt = match trigger.record_id() {
            Some(id) => {
                let count = self.attempts.entry(id).or_insert(0);
                *count += 1;
                *count
            }
            None => 1,
        };

        if attempt > self.max_attempts {
            error!(
                record = ?trigger.record_id(),
                attempts = self.max_attempts,
                "retry budget exhausted, trigger dropped"
            );
            if let Some(id) = trigger.record_id() {
                self.attempts.remove(&id);
            }
            return;
        }

        tokio::time::sleep(self.delay).await;
        warn!(record = ?trigger.record_id(), attempt, "re-publishing dead-lettered trigger");
        self.bus.publish(trigger).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dk_01_key_lifecycle::adapters::{
        InMemoryClaimStore, InMemoryKeyRecordStore, RecordingGateway,
    };
    use dk_01_key_lifecycle::ports::{GatewayError, KeyRecordStore};
    use shared_types::{AccountId, KeyEventPayload, KeyRecord, KeyState, KeyType};

    struct Harness {
        records: Arc<InMemoryKeyRecordStore>,
        gateway: Arc<RecordingGateway>,
        bus: Arc<InMemoryEventBus>,
        handler: Arc<LifecycleHandler>,
    }

    fn harness() -> Harness {
        let records = Arc::new(InMemoryKeyRecordStore::new());
        let claims = Arc::new(InMemoryClaimStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = Arc::new(LifecycleHandler::new(
            records.clone(),
            claims.clone(),
            gateway.clone(),
            bus.clone(),
        ));
        Harness {
            records,
            gateway,
            bus,
            handler,
        }
    }

    async fn wait_for_state(
        records: &InMemoryKeyRecordStore,
        id: shared_types::KeyRecordId,
        state: KeyState,
    ) {
        for _ in 0..100 {
            if records.get_by_id(id).unwrap().map(|r| r.state) == Some(state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("record {id} never reached {state:?}");
    }

    #[tokio::test]
    async fn test_dispatcher_applies_trigger() {
        let h = harness();
        let record =
            KeyRecord::new(KeyType::Phone, Some("5511999990000".into()), AccountId::random())
                .with_state(KeyState::Confirmed);
        h.records.insert(record.clone());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Dispatcher::new(h.handler.clone(), h.bus.clone()).run(shutdown_rx));

        // Give the loop a moment to subscribe before publishing.
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.bus
            .publish(DirectoryEvent::KeyConfirmed(KeyEventPayload::new(
                record.id,
                record.owner,
                record.state,
            )))
            .await;

        wait_for_state(&h.records, record.id, KeyState::AddKeyReady).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_worker_redelivers_until_recovery() {
        let h = harness();
        h.gateway
            .fail_with(GatewayError::Unavailable("directory offline".into()));

        let record =
            KeyRecord::new(KeyType::Phone, Some("5511999990000".into()), AccountId::random())
                .with_state(KeyState::Confirmed);
        h.records.insert(record.clone());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher =
            tokio::spawn(Dispatcher::new(h.handler.clone(), h.bus.clone()).run(shutdown_rx.clone()));
        let retry = RetryWorker::new(
            h.bus.clone(),
            shared_bus::RETRY_CHANNEL,
            100,
            Duration::from_millis(10),
        );
        let retry_task = tokio::spawn(retry.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        h.bus
            .publish(DirectoryEvent::KeyConfirmed(KeyEventPayload::new(
                record.id,
                record.owner,
                record.state,
            )))
            .await;

        // Let at least one failed attempt reach the dead-letter channel.
        tokio::time::sleep(Duration::from_millis(30)).await;
        h.gateway.recover();

        wait_for_state(&h.records, record.id, KeyState::AddKeyReady).await;
        shutdown_tx.send(true).unwrap();
        dispatcher.await.unwrap();
        retry_task.await.unwrap();
    }
}
