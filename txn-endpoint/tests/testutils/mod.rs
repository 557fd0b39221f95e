//! Test utilities for transaction endpoint integration tests
//!
//! - TestFixture: endpoint over a fresh in-memory engine with JSON helpers
//! - RecordingExecutor: engine double that logs statement entry/exit for
//!   interleaving checks

#![allow(dead_code)]

pub mod recording_executor;
pub mod test_fixture;
