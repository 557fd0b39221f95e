// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Session protocol: request decoding, response envelopes and the handler
//! that drives transactions through the registry.

pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod uri;

pub use error::{ErrorKind, ErrorRecord, StructuralError};
pub use handler::SessionProtocolHandler;
pub use request::StatementBatch;
pub use response::{
    DataEntry, FormattedRow, GraphData, GraphNode, ResponseEnvelope, ResultEntry, StatusCode,
    TransactionInfo, TransactionResponse,
};
pub use uri::UriScheme;
