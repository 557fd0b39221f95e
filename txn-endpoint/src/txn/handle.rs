// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction handles and their execution slot
//!
//! A [`TransactionHandle`] owns exactly one engine transaction. The engine
//! transaction lives inside the handle's execution slot, a mutex that a
//! request (or the reaper) must hold before it may touch the transaction.
//! Holding the slot is represented by an [`ExecutionSlot`] guard; dropping the
//! guard releases the slot.

use super::error::TxnError;
use super::state::{TransactionId, TransactionState};
use crate::engine::{EngineTransaction, Statement, StatementResult};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Activity {
    instant: Instant,
    wall: DateTime<Utc>,
}

impl Activity {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Server-side state of one transaction
pub struct TransactionHandle {
    id: TransactionId,
    state: Mutex<TransactionState>,
    last_activity: Mutex<Activity>,
    slot: Mutex<Option<Box<dyn EngineTransaction>>>,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl TransactionHandle {
    /// Wrap a freshly begun engine transaction in an Open handle
    pub fn new(id: TransactionId, transaction: Box<dyn EngineTransaction>) -> Self {
        let activity = Activity::now();
        Self {
            id,
            state: Mutex::new(TransactionState::Open),
            last_activity: Mutex::new(activity),
            slot: Mutex::new(Some(transaction)),
            created_at: activity.wall,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Refresh the last activity time
    pub fn touch(&self) {
        *self.last_activity.lock() = Activity::now();
    }

    /// Time since the last touch
    pub fn idle_time(&self) -> Duration {
        self.last_activity.lock().instant.elapsed()
    }

    /// Wall-clock instant at which the handle becomes eligible for expiry
    pub fn expires_at(&self, idle_timeout: Duration) -> DateTime<Utc> {
        let last = self.last_activity.lock().wall;
        let timeout = chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);
        last.checked_add_signed(timeout).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Acquire the execution slot, waiting at most `wait`
    ///
    /// Contention is reported as [`TxnError::Busy`]; requests are never queued
    /// behind each other.
    pub fn acquire_slot(&self, wait: Duration) -> Result<ExecutionSlot<'_>, TxnError> {
        let guard = if wait.is_zero() {
            self.slot.try_lock()
        } else {
            self.slot.try_lock_for(wait)
        };

        match guard {
            Some(transaction) => Ok(ExecutionSlot {
                handle: self,
                transaction,
            }),
            None => {
                debug!("TXN {}: execution slot busy", self.id);
                Err(TxnError::Busy(self.id))
            }
        }
    }

    fn transition(&self, next: TransactionState) -> Result<TransactionState, TxnError> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(TxnError::IllegalTransition {
                from: *state,
                to: next,
            });
        }
        let previous = *state;
        *state = next;
        Ok(previous)
    }
}

/// Exclusive access to a handle's engine transaction
///
/// Only one `ExecutionSlot` exists per handle at any time.
pub struct ExecutionSlot<'a> {
    handle: &'a TransactionHandle,
    transaction: MutexGuard<'a, Option<Box<dyn EngineTransaction>>>,
}

impl ExecutionSlot<'_> {
    pub fn handle(&self) -> &TransactionHandle {
        self.handle
    }

    /// Whether the transaction still accepts statements
    ///
    /// The state may have changed between registry lookup and slot
    /// acquisition, so callers check this once they hold the slot.
    pub fn is_open(&self) -> bool {
        self.handle.is_open() && self.transaction.is_some()
    }

    /// Execute one statement
    pub fn execute(&mut self, statement: &Statement) -> Result<StatementResult, TxnError> {
        if !self.handle.is_open() {
            return Err(TxnError::NotFound(self.handle.id));
        }
        let transaction = self
            .transaction
            .as_mut()
            .ok_or(TxnError::NotFound(self.handle.id))?;
        Ok(transaction.execute(statement)?)
    }

    /// Durably commit, ending in `Committed` or `RolledBack`
    pub fn commit(mut self) -> Result<(), TxnError> {
        self.handle.transition(TransactionState::Committing)?;
        let transaction = self
            .transaction
            .take()
            .ok_or(TxnError::NotFound(self.handle.id))?;

        match transaction.commit() {
            Ok(()) => {
                self.handle.transition(TransactionState::Committed)?;
                info!("TXN {}: committed", self.handle.id);
                Ok(())
            }
            Err(e) => {
                warn!("TXN {}: commit failed: {}", self.handle.id, e);
                self.handle.transition(TransactionState::RolledBack)?;
                Err(e.into())
            }
        }
    }

    /// Abandon the transaction, ending in `RolledBack`
    pub fn rollback(self) -> Result<(), TxnError> {
        self.abandon(TransactionState::RolledBack)
    }

    /// Abandon the transaction on behalf of the reaper, ending in `Expired`
    pub fn expire(self) -> Result<(), TxnError> {
        self.abandon(TransactionState::Expired)
    }

    fn abandon(mut self, terminal: TransactionState) -> Result<(), TxnError> {
        self.handle.transition(terminal)?;
        if let Some(transaction) = self.transaction.take() {
            transaction.rollback();
        }
        info!("TXN {}: {}", self.handle.id, terminal);
        Ok(())
    }
}
