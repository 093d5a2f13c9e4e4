//! End-to-end integration tests.
//!
//! Each test wires a complete node (bus, dispatch loop, retry loop,
//! lifecycle handler, in-memory stores) around a scriptable gateway and
//! drives it purely through published events.

pub mod harness;

#[cfg(test)]
mod choreography;
#[cfg(test)]
mod failure_injection;
