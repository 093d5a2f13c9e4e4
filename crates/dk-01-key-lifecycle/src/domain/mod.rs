//! Domain layer: pure decision logic for the key lifecycle.

pub mod conflicts;
pub mod errors;
pub mod machine;

pub use conflicts::ConflictResolver;
pub use errors::LifecycleError;
pub use machine::{Decision, KeyStateMachine};
