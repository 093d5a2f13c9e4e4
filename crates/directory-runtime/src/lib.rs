//! # DirKey Directory Runtime
//!
//! Entry point wiring for the DirKey node.
//!
//! ## Architecture
//!
//! The node is event-choreographed: triggers arrive on the in-process bus,
//! the dispatch loop feeds them to the key-lifecycle handler, and outcome
//! events flow back onto the bus for downstream consumers.
//!
//! ```text
//!   triggers ──→ Event Bus ──→ Dispatcher ──→ LifecycleHandler
//!                    ↑                              │
//!                    │          outcome events      │
//!                    ├──────────────────────────────┤
//!                    │        dead letters          │
//!                    └────── RetryWorker ←──────────┘
//! ```
//!
//! ## Modular Structure
//!
//! - `config` - Environment-driven runtime configuration
//! - `adapters` - Standalone implementations of the external ports
//! - `dispatcher` - Dispatch and retry loops

pub mod adapters;
pub mod config;
pub mod dispatcher;

use crate::adapters::LoggingDirectoryGateway;
use crate::config::RuntimeConfig;
use crate::dispatcher::{Dispatcher, RetryWorker};
use dk_01_key_lifecycle::adapters::{InMemoryClaimStore, InMemoryKeyRecordStore};
use dk_01_key_lifecycle::handlers::LifecycleHandler;
use shared_bus::InMemoryEventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// The running node: wired services plus the loop task handles.
pub struct DirectoryRuntime {
    bus: Arc<InMemoryEventBus>,
    records: Arc<InMemoryKeyRecordStore>,
    claims: Arc<InMemoryClaimStore>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl DirectoryRuntime {
    /// Wire the node and start its loops.
    pub fn start(config: RuntimeConfig) -> Self {
        info!(
            capacity = config.channel_capacity,
            retry_channel = %config.retry_channel,
            "starting directory runtime"
        );

        let bus = Arc::new(InMemoryEventBus::with_capacity(config.channel_capacity));
        let records = Arc::new(InMemoryKeyRecordStore::new());
        let claims = Arc::new(InMemoryClaimStore::new());
        let gateway = Arc::new(LoggingDirectoryGateway::new());

        let handler = Arc::new(
            LifecycleHandler::new(records.clone(), claims.clone(), gateway, bus.clone())
                .with_retry_channel(config.retry_channel.clone()),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = Dispatcher::new(handler, bus.clone());
        let retry = RetryWorker::new(
            bus.clone(),
            config.retry_channel,
            config.max_retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        );

        let tasks = vec![
            tokio::spawn(dispatcher.run(shutdown_rx.clone())),
            tokio::spawn(retry.run(shutdown_rx)),
        ];

        Self {
            bus,
            records,
            claims,
            shutdown_tx,
            tasks,
        }
    }

    /// The event bus the node runs on.
    #[must_use]
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    /// The key record store, for bootstrap seeding and inspection.
    #[must_use]
    pub fn records(&self) -> Arc<InMemoryKeyRecordStore> {
        self.records.clone()
    }

    /// The claim store, for bootstrap seeding and inspection.
    #[must_use]
    pub fn claims(&self) -> Arc<InMemoryClaimStore> {
        self.claims.clone()
    }

    /// Signal the loops to stop and wait for them to exit.
    pub async fn shutdown(self) {
        info!("shutting down directory runtime");
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("directory runtime stopped");
    }
}
