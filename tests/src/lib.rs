//! # DirKey Test Suite
//!
//! End-to-end tests exercising the full choreography: bus, dispatch loop,
//! lifecycle handler, stores, and gateway together.

pub mod integration;
