//! Integration tests for pulse-tracker.
//!
//! These tests run the ticker feed against a local mock server:
//! - Connection lifecycle and reconnects
//! - Frame delivery through to snapshots and history

pub mod common;
