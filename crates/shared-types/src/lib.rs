//! # Shared Types Crate
//!
//! This crate contains the domain entities and cross-subsystem message
//! payloads for the DirKey directory-key lifecycle service.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Closed State Enum**: `KeyState` is a closed tagged union; every
//!   decision function matches it exhaustively, so an unsupported
//!   state/event combination is a compile-time failure, not a silent default.
//! - **Weak Claim Reference**: a `KeyRecord` holds a `ClaimId`, never the
//!   `Claim` itself; the claim's lifecycle is independent of the record's.

pub mod entities;
pub mod messages;

pub use entities::*;
pub use messages::*;
