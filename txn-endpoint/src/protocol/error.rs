// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Wire error taxonomy
//!
//! Internal errors are converted into [`ErrorRecord`]s at the protocol
//! boundary. Only the `Display` text of the source error is exposed.

use crate::engine::{EngineError, StatementError};
use crate::txn::TxnError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes reported in the `errors` array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidRequestFormat,
    InvalidTransactionId,
    ConcurrentRequest,
    StatementSyntaxError,
    StatementTypeError,
    StatementRuntimeError,
    StatementParameterMissing,
    EngineFatalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequestFormat => "InvalidRequestFormat",
            ErrorKind::InvalidTransactionId => "InvalidTransactionId",
            ErrorKind::ConcurrentRequest => "ConcurrentRequest",
            ErrorKind::StatementSyntaxError => "StatementSyntaxError",
            ErrorKind::StatementTypeError => "StatementTypeError",
            ErrorKind::StatementRuntimeError => "StatementRuntimeError",
            ErrorKind::StatementParameterMissing => "StatementParameterMissing",
            ErrorKind::EngineFatalError => "EngineFatalError",
        }
    }

    /// Whether the error came from executing a statement
    pub fn is_statement_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::StatementSyntaxError
                | ErrorKind::StatementTypeError
                | ErrorKind::StatementRuntimeError
                | ErrorKind::StatementParameterMissing
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `errors` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: ErrorKind,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&StatementError> for ErrorRecord {
    fn from(err: &StatementError) -> Self {
        let code = match err {
            StatementError::Syntax(_) => ErrorKind::StatementSyntaxError,
            StatementError::Type(_) => ErrorKind::StatementTypeError,
            StatementError::Runtime(_) => ErrorKind::StatementRuntimeError,
            StatementError::ParameterMissing(_) => ErrorKind::StatementParameterMissing,
        };
        ErrorRecord::new(code, err.to_string())
    }
}

impl From<&EngineError> for ErrorRecord {
    fn from(err: &EngineError) -> Self {
        ErrorRecord::new(ErrorKind::EngineFatalError, err.to_string())
    }
}

impl From<&TxnError> for ErrorRecord {
    fn from(err: &TxnError) -> Self {
        match err {
            TxnError::NotFound(_) | TxnError::IllegalTransition { .. } => {
                ErrorRecord::new(ErrorKind::InvalidTransactionId, err.to_string())
            }
            TxnError::Busy(_) => ErrorRecord::new(ErrorKind::ConcurrentRequest, err.to_string()),
            TxnError::Statement(e) => e.into(),
            TxnError::Engine(e) => e.into(),
        }
    }
}

impl From<&StructuralError> for ErrorRecord {
    fn from(err: &StructuralError) -> Self {
        ErrorRecord::new(ErrorKind::InvalidRequestFormat, err.to_string())
    }
}

/// Malformed request body
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Unable to deserialize request: {0}")]
    InvalidJson(String),

    #[error("Unable to deserialize request: expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Unable to deserialize request: expected `statements` to be a list")]
    StatementsNotAList,

    #[error("Unable to deserialize statement {index}: {reason}")]
    InvalidStatement { index: usize, reason: String },
}

/// JSON type name used in structural error messages
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::TransactionId;
    use serde_json::json;

    #[test]
    fn test_error_kind_serializes_as_name() {
        let record = ErrorRecord::new(ErrorKind::ConcurrentRequest, "busy");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"code": "ConcurrentRequest", "message": "busy"})
        );
    }

    #[test]
    fn test_txn_error_mapping() {
        let id = TransactionId::from_u64(3);
        assert_eq!(
            ErrorRecord::from(&TxnError::NotFound(id)).code,
            ErrorKind::InvalidTransactionId
        );
        assert_eq!(
            ErrorRecord::from(&TxnError::Busy(id)).code,
            ErrorKind::ConcurrentRequest
        );
        assert_eq!(
            ErrorRecord::from(&TxnError::Statement(StatementError::Runtime("x".into()))).code,
            ErrorKind::StatementRuntimeError
        );
        assert_eq!(
            ErrorRecord::from(&TxnError::Engine(EngineError::CommitFailed("x".into()))).code,
            ErrorKind::EngineFatalError
        );
    }

    #[test]
    fn test_statement_error_message_is_display_text() {
        let record = ErrorRecord::from(&StatementError::ParameterMissing("name".into()));
        assert_eq!(record.code, ErrorKind::StatementParameterMissing);
        assert_eq!(record.message, "Expected parameter(s): name");
        assert!(record.code.is_statement_error());
    }
}
