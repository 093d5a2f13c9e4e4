//! # dk-01-key-lifecycle
//!
//! Key Lifecycle subsystem for DirKey.
//!
//! ## Role in System
//!
//! - **Choreography Participant**: Subscribes to the inbound directory
//!   triggers, publishes the outcome events downstream consumers act on.
//! - **Single Writer**: The only component that mutates `KeyRecord` and
//!   `Claim` state; it does so exclusively through `KeyStateMachine`
//!   decisions.
//!
//! ## Choreography Flow
//!
//! ```text
//! [Directory Sync] ──KeyConfirmed/Claim*/Portability*──→ [Event Bus]
//!                                                             │
//!                                                             ↓
//!                                                 [Key Lifecycle (dk-01)]
//!                                                             │
//!                        ┌────────────────────────────────────┤
//!                        ↓                                    ↓
//!              [Directory Gateway]                  [Record/Claim Stores]
//!                        │                                    │
//!                        └──────────→ [Event Bus] ←───────────┘
//!                              KeyReady / ClaimClosed / ...
//! ```
//!
//! ## Failure Isolation
//!
//! A transient gateway failure never commits a state change: the handler
//! routes the original trigger to the dead-letter channel and leaves the
//! record exactly where it was, so a retried message re-attempts the same
//! decision deterministically.

pub mod adapters;
pub mod domain;
pub mod handlers;
pub mod ports;

pub use domain::*;
pub use handlers::*;
pub use ports::*;
