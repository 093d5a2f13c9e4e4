//! Ports: the external collaborators consumed through trait interfaces.

pub mod gateway;
pub mod stores;

pub use gateway::{CreateKeyOutcome, CreatedKey, DirectoryGateway, GatewayError};
pub use stores::{ClaimStore, KeyRecordStore, StoreError};
