//! Application layer orchestrating payment attempts.
//!
//! `PaymentBridge` is the primary entry point: it starts an embedded process, drives
//! a `BridgeChannel` through `initialise` and hands the single outcome to the caller's
//! hooks. The channel's receiver runs as its own `tokio` task and reports back over a
//! one-shot channel.

pub mod attempt;
pub mod bridge;
pub mod registry;
