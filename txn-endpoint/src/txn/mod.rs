// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction management for the session protocol
//!
//! # Features
//! - Transaction registry with monotonic, never reused ids
//! - Per-transaction execution slot (at most one request at a time)
//! - Forward-only lifecycle: Open, Committing, Committed, RolledBack, Expired
//! - Background expiry of idle transactions

pub mod error;
pub mod handle;
pub mod reaper;
pub mod registry;
pub mod state;

pub use error::TxnError;
pub use handle::{ExecutionSlot, TransactionHandle};
pub use reaper::{ExpiryReaper, ReaperHandle};
pub use registry::{TransactionRegistry, TransactionStatistics};
pub use state::{TransactionId, TransactionState};
