// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session protocol handler
//!
//! Implements begin, execute, commit, implicit commit and rollback on top of
//! the transaction registry. Every operation that runs statements goes
//! through [`SessionProtocolHandler::drive`]:
//!
//! 1. acquire the handle's execution slot (bounded wait, then `ConcurrentRequest`)
//! 2. touch the handle
//! 3. run the batch in order, stopping at the first failure
//! 4. on failure roll back, otherwise keep the transaction open or commit it
//!
//! The status code is fixed before the batch runs. Statement failures only
//! ever show up in the `errors` array of the envelope.

use super::error::ErrorRecord;
use super::request::StatementBatch;
use super::response::{
    ResponseEnvelope, ResultEntry, StatusCode, TransactionInfo, TransactionResponse,
};
use super::uri::UriScheme;
use crate::txn::{
    ExecutionSlot, TransactionHandle, TransactionId, TransactionRegistry, TxnError,
};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// What to do once a batch has run without errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    KeepOpen,
    Commit,
}

/// State of the transaction after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Open,
    Committed,
    RolledBack,
}

pub struct SessionProtocolHandler {
    registry: Arc<TransactionRegistry>,
    uris: UriScheme,
    idle_timeout: Duration,
    slot_wait: Duration,
}

impl SessionProtocolHandler {
    pub fn new(
        registry: Arc<TransactionRegistry>,
        uris: UriScheme,
        idle_timeout: Duration,
        slot_wait: Duration,
    ) -> Self {
        Self {
            registry,
            uris,
            idle_timeout,
            slot_wait,
        }
    }

    pub fn registry(&self) -> &Arc<TransactionRegistry> {
        &self.registry
    }

    pub fn uris(&self) -> &UriScheme {
        &self.uris
    }

    /// Open a transaction and run the batch in it
    ///
    /// Answers 201 with a `Location` even when the batch failed and the new
    /// transaction was rolled back straight away. Fails only when the engine
    /// cannot begin a transaction.
    pub fn begin(&self, batch: &StatementBatch) -> Result<TransactionResponse, TxnError> {
        let (id, handle) = self.registry.create()?;
        let mut body = ResponseEnvelope::new();

        let outcome = self.drive(&handle, batch, Finish::KeepOpen, &mut body);
        let response = self.respond(StatusCode::Created, &handle, outcome, body);
        Ok(response.with_location(self.uris.transaction_uri(id)))
    }

    /// Run a batch in an open transaction
    ///
    /// An empty batch only refreshes the idle timer.
    pub fn execute(&self, id: TransactionId, batch: &StatementBatch) -> TransactionResponse {
        let handle = match self.registry.acquire(id) {
            Ok(handle) => handle,
            Err(e) => return rejected(&e),
        };

        let mut body = ResponseEnvelope::new();
        let outcome = self.drive(&handle, batch, Finish::KeepOpen, &mut body);
        self.respond(StatusCode::Ok, &handle, outcome, body)
    }

    /// Run an optional trailing batch, then commit
    pub fn commit(&self, id: TransactionId, batch: &StatementBatch) -> TransactionResponse {
        let handle = match self.registry.acquire(id) {
            Ok(handle) => handle,
            Err(e) => return rejected(&e),
        };

        let mut body = ResponseEnvelope::new();
        let outcome = self.drive(&handle, batch, Finish::Commit, &mut body);
        self.respond(StatusCode::Ok, &handle, outcome, body)
    }

    /// Begin, run and commit in one request
    ///
    /// No resource survives the request, so the answer is 200 without a
    /// `Location`.
    pub fn commit_new(&self, batch: &StatementBatch) -> Result<TransactionResponse, TxnError> {
        let (_, handle) = self.registry.create()?;
        let mut body = ResponseEnvelope::new();

        let outcome = self.drive(&handle, batch, Finish::Commit, &mut body);
        Ok(self.respond(StatusCode::Ok, &handle, outcome, body))
    }

    /// Abandon an open transaction
    pub fn rollback(&self, id: TransactionId) -> TransactionResponse {
        let handle = match self.registry.acquire(id) {
            Ok(handle) => handle,
            Err(e) => return rejected(&e),
        };

        let result = handle.acquire_slot(self.slot_wait).and_then(|slot| {
            if !slot.is_open() {
                return Err(TxnError::NotFound(id));
            }
            slot.rollback()
        });

        match result {
            Ok(()) => {
                self.registry.retire(&handle);
                TransactionResponse::new(StatusCode::Ok, ResponseEnvelope::new())
            }
            Err(e) => rejected(&e),
        }
    }

    fn drive(
        &self,
        handle: &TransactionHandle,
        batch: &StatementBatch,
        finish: Finish,
        body: &mut ResponseEnvelope,
    ) -> Result<Outcome, TxnError> {
        let mut slot = handle.acquire_slot(self.slot_wait)?;
        if !slot.is_open() {
            return Err(TxnError::NotFound(handle.id()));
        }
        self.registry.touch(handle.id());

        if let Err(error) = run_batch(&mut slot, batch, body) {
            debug!(
                "TXN {}: statement failed ({}), rolling back",
                handle.id(),
                error.code
            );
            body.push_error(error);
            if let Err(e) = slot.rollback() {
                warn!("TXN {}: rollback after failure: {}", handle.id(), e);
            }
            return Ok(Outcome::RolledBack);
        }

        match finish {
            Finish::KeepOpen => {
                self.registry.touch(handle.id());
                Ok(Outcome::Open)
            }
            Finish::Commit => match slot.commit() {
                Ok(()) => Ok(Outcome::Committed),
                Err(e) => {
                    body.push_error(ErrorRecord::from(&e));
                    Ok(Outcome::RolledBack)
                }
            },
        }
    }

    /// Turn the outcome of `drive` into a response
    ///
    /// Requests rejected before running anything get a single-error response
    /// with their own status. Terminal transactions leave the registry.
    fn respond(
        &self,
        status: StatusCode,
        handle: &TransactionHandle,
        outcome: Result<Outcome, TxnError>,
        mut body: ResponseEnvelope,
    ) -> TransactionResponse {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => return rejected(&e),
        };

        match outcome {
            Outcome::Open => {
                let id = handle.id();
                body.commit = Some(self.uris.commit_uri(id));
                body.transaction = Some(TransactionInfo {
                    expires: handle.expires_at(self.idle_timeout).to_rfc2822(),
                });
            }
            Outcome::Committed | Outcome::RolledBack => {
                self.registry.retire(handle);
                info!("TXN {}: finished as {}", handle.id(), handle.state());
            }
        }
        TransactionResponse::new(status, body)
    }
}

/// Run statements in order until the first failure
fn run_batch(
    slot: &mut ExecutionSlot<'_>,
    batch: &StatementBatch,
    body: &mut ResponseEnvelope,
) -> Result<(), ErrorRecord> {
    for entry in batch.iter() {
        let statement = entry.map_err(|e| ErrorRecord::from(&e))?;
        let result = slot
            .execute(&statement)
            .map_err(|e| ErrorRecord::from(&e))?;
        body.push_result(ResultEntry::new(result, &statement.result_data_contents));
    }
    Ok(())
}

/// Response for a request that never got to run
fn rejected(error: &TxnError) -> TransactionResponse {
    let status = match error {
        TxnError::Busy(_) => StatusCode::Conflict,
        TxnError::Engine(_) => StatusCode::ServiceUnavailable,
        _ => StatusCode::NotFound,
    };
    TransactionResponse::error(status, ErrorRecord::from(error))
}
