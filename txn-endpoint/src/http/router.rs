// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Path matching and dispatch for the transaction endpoints

use super::Method;
use crate::protocol::{
    ErrorKind, ErrorRecord, SessionProtocolHandler, StatementBatch, StatusCode,
    TransactionResponse,
};
use crate::txn::TransactionId;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// `/transaction`, `/transaction/commit`, `/transaction/{id}` and `/transaction/{id}/commit`
static TRANSACTION_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/transaction(?:/(?P<id>\d+))?(?P<commit>/commit)?/?$")
        .expect("transaction path pattern is valid")
});

/// Resource addressed by a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `{base}/transaction`
    Begin,
    /// `{base}/transaction/commit`
    CommitNew,
    /// `{base}/transaction/{id}`
    Transaction(TransactionId),
    /// `{base}/transaction/{id}/commit`
    Commit(TransactionId),
}

/// Routes raw requests to the session protocol handler
pub struct TransactionRouter {
    handler: Arc<SessionProtocolHandler>,
}

impl TransactionRouter {
    pub fn new(handler: Arc<SessionProtocolHandler>) -> Self {
        Self { handler }
    }

    /// Resolve a path (absolute URI or path under the base URI) to a route
    ///
    /// `Err` carries the response for paths that address nothing.
    pub fn resolve(&self, path: &str) -> Result<Route, TransactionResponse> {
        let uris = self.handler.uris();
        let path = path.split('?').next().unwrap_or(path);
        let relative = path
            .strip_prefix(uris.base_uri())
            .or_else(|| path.strip_prefix(uris.base_path()))
            .ok_or_else(|| not_found(path))?;

        let captures = TRANSACTION_PATH
            .captures(relative)
            .ok_or_else(|| not_found(path))?;
        let is_commit = captures.name("commit").is_some();

        let id = match captures.name("id") {
            None => None,
            Some(m) => match m.as_str().parse::<TransactionId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    return Err(TransactionResponse::error(
                        StatusCode::NotFound,
                        ErrorRecord::new(
                            ErrorKind::InvalidTransactionId,
                            format!("Unrecognized transaction id {}", m.as_str()),
                        ),
                    ))
                }
            },
        };

        Ok(match (id, is_commit) {
            (None, false) => Route::Begin,
            (None, true) => Route::CommitNew,
            (Some(id), false) => Route::Transaction(id),
            (Some(id), true) => Route::Commit(id),
        })
    }

    /// Dispatch one request
    pub fn route(&self, method: Method, path: &str, body: &[u8]) -> TransactionResponse {
        debug!("ROUTER: {} {}", method, path);
        let route = match self.resolve(path) {
            Ok(route) => route,
            Err(response) => return response,
        };

        match (method, route) {
            (Method::Delete, Route::Transaction(id)) => self.handler.rollback(id),
            (Method::Post, route) => {
                let batch = match StatementBatch::parse(body) {
                    Ok(batch) => batch,
                    Err(e) => {
                        return TransactionResponse::error(StatusCode::BadRequest, ErrorRecord::from(&e))
                    }
                };
                let outcome = match route {
                    Route::Begin => self.handler.begin(&batch),
                    Route::CommitNew => self.handler.commit_new(&batch),
                    Route::Transaction(id) => Ok(self.handler.execute(id, &batch)),
                    Route::Commit(id) => Ok(self.handler.commit(id, &batch)),
                };
                outcome.unwrap_or_else(|e| {
                    TransactionResponse::error(StatusCode::ServiceUnavailable, ErrorRecord::from(&e))
                })
            }
            (method, _) => TransactionResponse::error(
                StatusCode::MethodNotAllowed,
                ErrorRecord::new(
                    ErrorKind::InvalidRequestFormat,
                    format!("Method {} is not allowed on {}", method, path),
                ),
            ),
        }
    }
}

fn not_found(path: &str) -> TransactionResponse {
    TransactionResponse::error(
        StatusCode::NotFound,
        ErrorRecord::new(
            ErrorKind::InvalidRequestFormat,
            format!("No resource at {}", path),
        ),
    )
}
