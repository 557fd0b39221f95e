// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction state management
//!
//! This module defines transaction identifiers and the lifecycle states a
//! transaction handle moves through.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for a transaction
///
/// Ids are handed out by the registry from a monotonic counter and are never
/// reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Get the underlying ID value
    pub fn id(&self) -> u64 {
        self.0
    }

    /// Create TransactionId from u64 (used when parsing request paths)
    pub fn from_u64(id: u64) -> Self {
        TransactionId(id)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(TransactionId)
    }
}

/// Transaction lifecycle states
///
/// ```text
/// Open ──► Committing ──► Committed
///   │           └───────► RolledBack
///   ├──────────────────► RolledBack
///   └──────────────────► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Transaction accepts statements
    Open,
    /// Trailing batch succeeded, engine commit in progress
    Committing,
    /// Transaction has been committed successfully
    Committed,
    /// Transaction has been rolled back (explicitly or after a failure)
    RolledBack,
    /// Transaction was rolled back by the reaper after idling too long
    Expired,
}

impl TransactionState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::RolledBack | TransactionState::Expired
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TransactionState::Open)
    }

    /// Whether moving from this state to `next` is a forward transition
    pub fn can_transition_to(&self, next: TransactionState) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Open, Committing)
                | (Open, RolledBack)
                | (Open, Expired)
                | (Committing, Committed)
                | (Committing, RolledBack)
                | (Committing, Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Open => "OPEN",
            TransactionState::Committing => "COMMITTING",
            TransactionState::Committed => "COMMITTED",
            TransactionState::RolledBack => "ROLLED_BACK",
            TransactionState::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
