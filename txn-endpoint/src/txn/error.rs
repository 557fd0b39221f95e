// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction registry and handle errors

use super::state::{TransactionId, TransactionState};
use crate::engine::{EngineError, StatementError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TxnError {
    #[error(
        "Unrecognized transaction id {0}. Transaction may have timed out and been rolled back"
    )]
    NotFound(TransactionId),

    #[error("Transaction {0} is being used by another request")]
    Busy(TransactionId),

    #[error("Illegal transaction transition from {from} to {to}")]
    IllegalTransition {
        from: TransactionState,
        to: TransactionState,
    },

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
