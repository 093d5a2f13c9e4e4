//! Adapters: in-memory implementations of the store and gateway ports.

pub mod memory;
pub mod recording;

pub use memory::{InMemoryClaimStore, InMemoryKeyRecordStore};
pub use recording::{GatewayCall, RecordingGateway};
