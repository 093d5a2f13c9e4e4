//! Test node wiring shared by the integration tests.

use directory_runtime::dispatcher::{Dispatcher, RetryWorker};
use dk_01_key_lifecycle::adapters::{
    InMemoryClaimStore, InMemoryKeyRecordStore, RecordingGateway,
};
use dk_01_key_lifecycle::handlers::LifecycleHandler;
use dk_01_key_lifecycle::ports::KeyRecordStore;
use shared_bus::{InMemoryEventBus, RETRY_CHANNEL};
use shared_types::{
    AccountId, Claim, ClaimType, KeyRecord, KeyRecordId, KeyState, KeyType,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A fully wired node over in-memory stores and a scriptable gateway.
pub struct TestNode {
    pub bus: Arc<InMemoryEventBus>,
    pub records: Arc<InMemoryKeyRecordStore>,
    pub claims: Arc<InMemoryClaimStore>,
    pub gateway: Arc<RecordingGateway>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestNode {
    /// Start a node with a generous retry budget and a short retry delay.
    pub async fn start() -> Self {
        Self::start_with_retry(100, Duration::from_millis(10)).await
    }

    /// Start a node with an explicit retry budget.
    pub async fn start_with_retry(max_attempts: u32, delay: Duration) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let records = Arc::new(InMemoryKeyRecordStore::new());
        let claims = Arc::new(InMemoryClaimStore::new());
        let gateway = Arc::new(RecordingGateway::new());

        let handler = Arc::new(LifecycleHandler::new(
            records.clone(),
            claims.clone(),
            gateway.clone(),
            bus.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(Dispatcher::new(handler, bus.clone()).run(shutdown_rx.clone())),
            tokio::spawn(
                RetryWorker::new(bus.clone(), RETRY_CHANNEL, max_attempts, delay)
                    .run(shutdown_rx),
            ),
        ];

        // Let the loops subscribe before the test publishes anything.
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            bus,
            records,
            claims,
            gateway,
            shutdown_tx,
            tasks,
        }
    }

    /// Seed a record with a value and state.
    pub fn seed_record(&self, value: &str, state: KeyState) -> KeyRecord {
        let record =
            KeyRecord::new(KeyType::Phone, Some(value.into()), AccountId::random())
                .with_state(state);
        self.records.insert(record.clone());
        record
    }

    /// Seed an open claim for a record and attach the reference.
    pub fn seed_claim(&self, record: &KeyRecord, claim_type: ClaimType) -> (KeyRecord, Claim) {
        let claim = Claim::open(record.value.clone().unwrap(), claim_type);
        self.claims.insert(claim.clone());
        let record = record.clone().with_claim_ref(claim.id);
        self.records.insert(record.clone());
        (record, claim)
    }

    /// Poll until the record reaches `state`, panicking after a deadline.
    pub async fn wait_for_state(&self, id: KeyRecordId, state: KeyState) {
        for _ in 0..200 {
            if self.state_of(id) == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "record {id} never reached {state:?}, stuck at {:?}",
            self.state_of(id)
        );
    }

    /// Current persisted state of a record.
    pub fn state_of(&self, id: KeyRecordId) -> KeyState {
        self.records
            .get_by_id(id)
            .unwrap()
            .map(|r| r.state)
            .expect("record not found")
    }

    /// Stop the loops and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
