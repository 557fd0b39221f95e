// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transactional HTTP query endpoint for a graph database
//!
//! This crate implements the stateful transaction protocol exposed over HTTP:
//! a client opens a server-side transaction, submits statement batches against
//! it across several requests, and finally commits or rolls it back.
//!
//! # Features
//!
//! - **Transaction Registry**: Concurrency-safe map of live transactions keyed by id
//! - **Execution Slots**: At most one request drives a transaction at a time
//! - **All-or-nothing Batches**: Any statement failure rolls the whole transaction back
//! - **Expiry Reaper**: Idle transactions are rolled back and evicted in the background
//! - **Pluggable Engine**: Statements run through the [`StatementExecutor`] trait
//!
//! # Usage
//!
//! ```no_run
//! use txn_endpoint::{EndpointConfig, MemoryEngine, Method, TransactionEndpoint};
//! use std::sync::Arc;
//!
//! let engine = MemoryEngine::new();
//! let endpoint = TransactionEndpoint::new(Arc::new(engine), EndpointConfig::default())
//!     .expect("valid configuration");
//!
//! let response = endpoint.handle_request(
//!     Method::Post,
//!     "/db/data/transaction/commit",
//!     br#"{"statements":[{"statement":"CREATE (n:Person {name: 'Alice'}) RETURN n"}]}"#,
//! );
//! assert!(response.body.errors.is_empty());
//! ```

pub mod config;
pub mod endpoint;
pub mod engine;
pub mod http;
pub mod protocol;
pub mod txn;

pub use config::{ConfigError, EndpointConfig};
pub use endpoint::TransactionEndpoint;
pub use engine::memory::MemoryEngine;
pub use engine::{
    EngineError, EngineTransaction, Node, ResultDataContent, Statement, StatementError,
    StatementExecutor, StatementResult, Value,
};
pub use http::{Method, TransactionRouter};
pub use protocol::{
    DataEntry, ErrorKind, ErrorRecord, ResponseEnvelope, ResultEntry, SessionProtocolHandler,
    StatementBatch, StatusCode, StructuralError, TransactionResponse,
};
pub use txn::{
    ExpiryReaper, ReaperHandle, TransactionHandle, TransactionId, TransactionRegistry,
    TransactionState, TransactionStatistics, TxnError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
