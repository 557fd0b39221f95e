// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution interface
//!
//! The transaction protocol never interprets statement text itself. It only
//! needs an engine that can open a transaction, run one statement at a time
//! inside it, and finally commit or abandon it:
//!
//! - [`StatementExecutor`]: opens engine transactions (shared across requests)
//! - [`EngineTransaction`]: one unit of work, owned by exactly one handle
//!
//! [`memory::MemoryEngine`] is a small in-memory implementation used by the
//! tests and the console.

pub mod error;
pub mod memory;
pub mod parser;
pub mod value;

pub use error::{EngineError, StatementError};
pub use value::{Node, Value};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Shape a statement's rows are reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultDataContent {
    /// Row values in column order
    Row,
    /// Nodes referenced by the row
    Graph,
}

impl ResultDataContent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultDataContent::Row => "row",
            ResultDataContent::Graph => "graph",
        }
    }
}

impl fmt::Display for ResultDataContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultDataContent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "row" => Ok(ResultDataContent::Row),
            "graph" => Ok(ResultDataContent::Graph),
            other => Err(format!("unknown result data content `{}`", other)),
        }
    }
}

/// A single statement with its bound parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// Statement text as submitted by the client
    pub text: String,
    /// Named parameters referenced as `$name` in the text
    pub parameters: BTreeMap<String, Value>,
    /// Requested result shapes; empty means plain rows
    pub result_data_contents: Vec<ResultDataContent>,
}

impl Statement {
    /// Create a statement without parameters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Bind a parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Report rows in the given shapes
    pub fn with_result_data_contents(
        mut self,
        contents: impl IntoIterator<Item = ResultDataContent>,
    ) -> Self {
        self.result_data_contents = contents.into_iter().collect();
        self
    }
}

/// Columns and rows produced by one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl StatementResult {
    /// Result with no columns and no rows (e.g. a DELETE)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }
}

/// Opens engine transactions
///
/// Implementations are shared by every request worker and the reaper, so
/// they must be thread-safe. Beginning a transaction should only fail on
/// resource exhaustion.
pub trait StatementExecutor: Send + Sync {
    /// Begin a new engine transaction
    fn begin_transaction(&self) -> Result<Box<dyn EngineTransaction>, EngineError>;
}

/// One open unit of work inside the engine
///
/// The handle that owns a transaction hands it to at most one worker at a
/// time, so implementations only need to be `Send`.
pub trait EngineTransaction: Send {
    /// Execute one statement inside this transaction
    fn execute(&mut self, statement: &Statement) -> Result<StatementResult, StatementError>;

    /// Durably apply every effect of this transaction
    fn commit(self: Box<Self>) -> Result<(), EngineError>;

    /// Discard every effect of this transaction
    fn rollback(self: Box<Self>);
}
