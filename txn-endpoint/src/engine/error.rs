// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine error types

use thiserror::Error;

/// Failure of a single statement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatementError {
    #[error("Invalid syntax: {0}")]
    Syntax(String),

    #[error("Type mismatch: {0}")]
    Type(String),

    #[error("Execution failed: {0}")]
    Runtime(String),

    #[error("Expected parameter(s): {0}")]
    ParameterMissing(String),
}

/// Failure of the engine itself (begin or commit)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Transaction limit reached: {0}")]
    ResourceExhausted(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),
}
