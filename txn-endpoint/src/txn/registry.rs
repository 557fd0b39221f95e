// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Registry of live transactions
//!
//! The registry is the only structure shared by every request worker and the
//! reaper. It maps ids to handles and never performs engine work while its
//! lock is held.

use super::error::TxnError;
use super::handle::TransactionHandle;
use super::state::{TransactionId, TransactionState};
use crate::engine::StatementExecutor;
use log::{debug, info};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStatistics {
    /// Handles currently held by the registry
    pub open: usize,
    /// Transactions created since startup
    pub created: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub expired: u64,
}

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    expired: AtomicU64,
}

/// Creates, looks up and removes transaction handles by id
pub struct TransactionRegistry {
    executor: Arc<dyn StatementExecutor>,
    handles: RwLock<HashMap<TransactionId, Arc<TransactionHandle>>>,
    next_id: AtomicU64,
    counters: Counters,
}

impl TransactionRegistry {
    pub fn new(executor: Arc<dyn StatementExecutor>) -> Self {
        Self {
            executor,
            handles: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Begin an engine transaction and register an Open handle for it
    ///
    /// Fails only when the engine cannot begin a transaction.
    pub fn create(&self) -> Result<(TransactionId, Arc<TransactionHandle>), TxnError> {
        let transaction = self.executor.begin_transaction()?;
        let id = TransactionId::from_u64(self.next_id.fetch_add(1, Ordering::SeqCst));
        let handle = Arc::new(TransactionHandle::new(id, transaction));

        self.handles.write().insert(id, handle.clone());
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        info!("TXN {}: begun", id);
        Ok((id, handle))
    }

    /// Look up an Open handle
    ///
    /// Unknown ids and ids that are no longer Open (committing or terminal)
    /// are all reported as [`TxnError::NotFound`].
    /// The caller still has to acquire the handle's execution slot before
    /// using it.
    pub fn acquire(&self, id: TransactionId) -> Result<Arc<TransactionHandle>, TxnError> {
        let handles = self.handles.read();
        match handles.get(&id) {
            Some(handle) if handle.state().is_open() => Ok(handle.clone()),
            _ => {
                debug!("TXN {}: lookup failed", id);
                Err(TxnError::NotFound(id))
            }
        }
    }

    /// Remove a handle, returning whether it was present
    pub fn remove(&self, id: TransactionId) -> bool {
        self.handles.write().remove(&id).is_some()
    }

    /// Refresh a handle's last activity, returning whether it was present
    pub fn touch(&self, id: TransactionId) -> bool {
        match self.handles.read().get(&id) {
            Some(handle) => {
                handle.touch();
                true
            }
            None => false,
        }
    }

    /// Remove a terminal handle and record its outcome
    ///
    /// Outcomes are only counted for the call that actually removed the
    /// handle, so retiring twice is harmless.
    pub fn retire(&self, handle: &TransactionHandle) {
        if !self.remove(handle.id()) {
            return;
        }
        let counter = match handle.state() {
            TransactionState::Committed => &self.counters.committed,
            TransactionState::RolledBack => &self.counters.rolled_back,
            TransactionState::Expired => &self.counters.expired,
            TransactionState::Open | TransactionState::Committing => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Handles idle for at least `idle_timeout`
    pub fn idle_handles(&self, idle_timeout: Duration) -> Vec<Arc<TransactionHandle>> {
        self.handles
            .read()
            .values()
            .filter(|handle| handle.idle_time() >= idle_timeout)
            .cloned()
            .collect()
    }

    /// Ids of the registered handles in ascending order
    pub fn open_ids(&self) -> Vec<TransactionId> {
        let mut ids: Vec<_> = self.handles.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    pub fn statistics(&self) -> TransactionStatistics {
        TransactionStatistics {
            open: self.len(),
            created: self.counters.created.load(Ordering::Relaxed),
            committed: self.counters.committed.load(Ordering::Relaxed),
            rolled_back: self.counters.rolled_back.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
        }
    }
}
