// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Background eviction of idle transactions

use super::registry::TransactionRegistry;
use super::TxnError;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Rolls back and evicts transactions idle longer than the timeout
///
/// The reaper competes for execution slots exactly like a request does, but
/// never waits: a handle whose slot is held is skipped and looked at again on
/// the next sweep.
#[derive(Clone)]
pub struct ExpiryReaper {
    registry: Arc<TransactionRegistry>,
    idle_timeout: Duration,
    interval: Duration,
}

impl ExpiryReaper {
    pub fn new(registry: Arc<TransactionRegistry>, idle_timeout: Duration, interval: Duration) -> Self {
        Self {
            registry,
            idle_timeout,
            interval,
        }
    }

    /// Run a single sweep, returning the number of expired transactions
    pub fn sweep(&self) -> usize {
        let mut expired = 0;

        for handle in self.registry.idle_handles(self.idle_timeout) {
            let slot = match handle.acquire_slot(Duration::ZERO) {
                Ok(slot) => slot,
                Err(_) => {
                    debug!("REAPER: transaction {} in use, skipping", handle.id());
                    continue;
                }
            };

            // A request may have touched or finished the handle since the scan.
            if !slot.is_open() || handle.idle_time() < self.idle_timeout {
                continue;
            }

            match slot.expire() {
                Ok(()) => {
                    self.registry.retire(&handle);
                    expired += 1;
                }
                Err(TxnError::IllegalTransition { from, .. }) => {
                    debug!("REAPER: transaction {} already {}", handle.id(), from);
                }
                Err(e) => warn!("REAPER: failed to expire transaction {}: {}", handle.id(), e),
            }
        }

        if expired > 0 {
            info!("REAPER: expired {} idle transaction(s)", expired);
        }
        expired
    }

    /// Start sweeping on the current tokio runtime
    ///
    /// Must be called from within a runtime context.
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.interval;
        info!(
            "REAPER: started (idle timeout {:?}, interval {:?})",
            self.idle_timeout, period
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.sweep();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("REAPER: stopped");
        });

        ReaperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running reaper task
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the reaper and wait for the task to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("REAPER: task ended abnormally: {}", e);
        }
    }
}
