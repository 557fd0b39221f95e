// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Response envelope
//!
//! The envelope is assembled while the batch runs: results are appended as
//! statements succeed and errors are appended when something fails. Whether a
//! transaction committed is decided from the error list, never from the
//! status code.

use super::error::{ErrorKind, ErrorRecord};
use crate::engine::{Node, ResultDataContent, StatementResult, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Columns and rows of one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultEntry {
    pub columns: Vec<String>,
    pub data: Vec<DataEntry>,
}

impl ResultEntry {
    /// Shape each row as requested; no contents means plain rows
    pub fn new(result: StatementResult, contents: &[ResultDataContent]) -> Self {
        let data = if contents.is_empty() {
            result.rows.into_iter().map(DataEntry::Row).collect()
        } else {
            result
                .rows
                .into_iter()
                .map(|row| DataEntry::Formatted(FormattedRow::new(row, contents)))
                .collect()
        };
        Self {
            columns: result.columns,
            data,
        }
    }
}

impl From<StatementResult> for ResultEntry {
    fn from(result: StatementResult) -> Self {
        Self::new(result, &[])
    }
}

/// One element of `data`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataEntry {
    /// `[v1, v2, ...]`
    Row(Vec<Value>),
    /// `{"row": [...], "graph": {...}}`
    Formatted(FormattedRow),
}

impl DataEntry {
    /// Row values, empty when only the graph was requested
    pub fn values(&self) -> &[Value] {
        match self {
            DataEntry::Row(values) => values,
            DataEntry::Formatted(formatted) => formatted.row.as_deref().unwrap_or(&[]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormattedRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphData>,
}

impl FormattedRow {
    pub fn new(row: Vec<Value>, contents: &[ResultDataContent]) -> Self {
        let graph = contents
            .contains(&ResultDataContent::Graph)
            .then(|| GraphData::from_row(&row));
        let row = contents.contains(&ResultDataContent::Row).then_some(row);
        Self { row, graph }
    }
}

/// Nodes referenced by one row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    /// The engine stores nodes only, so this stays empty.
    pub relationships: Vec<serde_json::Value>,
}

impl GraphData {
    /// Collect every distinct node in the row, including nodes inside lists and maps
    pub fn from_row(row: &[Value]) -> Self {
        let mut nodes = Vec::new();
        for value in row {
            collect_nodes(value, &mut nodes);
        }
        Self {
            nodes,
            relationships: Vec::new(),
        }
    }
}

/// Graph form of a node; ids are strings here
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl From<&Node> for GraphNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.to_string(),
            labels: node.labels.clone(),
            properties: node.properties.clone(),
        }
    }
}

fn collect_nodes(value: &Value, nodes: &mut Vec<GraphNode>) {
    match value {
        Value::Node(node) => {
            let id = node.id.to_string();
            if !nodes.iter().any(|seen| seen.id == id) {
                nodes.push(GraphNode::from(node));
            }
        }
        Value::List(items) => items.iter().for_each(|item| collect_nodes(item, nodes)),
        Value::Map(map) => map.values().for_each(|item| collect_nodes(item, nodes)),
        _ => {}
    }
}

/// Expiry information for an open transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionInfo {
    /// RFC 2822 timestamp
    pub expires: String,
}

/// Body of every protocol response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub results: Vec<ResultEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionInfo>,
    pub errors: Vec<ErrorRecord>,
}

impl ResponseEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope carrying a single error and no results
    pub fn from_error(error: ErrorRecord) -> Self {
        Self {
            errors: vec![error],
            ..Self::default()
        }
    }

    pub fn push_result(&mut self, result: impl Into<ResultEntry>) {
        self.results.push(result.into());
    }

    pub fn push_error(&mut self, error: ErrorRecord) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Codes of the reported errors in order
    pub fn error_codes(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(|e| e.code).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// HTTP status codes used by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Created,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    Conflict,
    ServiceUnavailable,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::Conflict => 409,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::Conflict => "Conflict",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::Created)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

/// Status, optional `Location` header and body of one response
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: ResponseEnvelope,
}

impl TransactionResponse {
    pub fn new(status: StatusCode, body: ResponseEnvelope) -> Self {
        Self {
            status,
            location: None,
            body,
        }
    }

    /// Response whose body carries one error and nothing else
    pub fn error(status: StatusCode, error: ErrorRecord) -> Self {
        Self::new(status, ResponseEnvelope::from_error(error))
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_field_order_and_optional_members() {
        let mut envelope = ResponseEnvelope::new();
        envelope.push_result(StatementResult::new(
            vec!["x".to_string()],
            vec![vec![Value::Integer(1)]],
        ));
        assert_eq!(
            envelope.to_json_string(),
            r#"{"results":[{"columns":["x"],"data":[[1]]}],"errors":[]}"#
        );

        envelope.commit = Some("http://localhost/db/data/transaction/1/commit".to_string());
        envelope.transaction = Some(TransactionInfo {
            expires: "Tue, 1 Jul 2003 10:52:37 +0000".to_string(),
        });
        let json = envelope.to_json();
        assert_eq!(json["commit"], json!("http://localhost/db/data/transaction/1/commit"));
        assert_eq!(json["transaction"]["expires"], json!("Tue, 1 Jul 2003 10:52:37 +0000"));
        assert!(envelope.to_json_string().starts_with(r#"{"commit":"#));
    }

    #[test]
    fn test_row_and_graph_contents() {
        let node = Node::new(
            7,
            vec!["Foo".to_string(), "Bar".to_string()],
            BTreeMap::from([("name".to_string(), Value::from("a"))]),
        );
        let result = StatementResult::new(
            vec!["n".to_string(), "again".to_string()],
            vec![vec![
                Value::Node(node.clone()),
                Value::List(vec![Value::Node(node), Value::Integer(1)]),
            ]],
        );

        let both = ResultEntry::new(
            result.clone(),
            &[ResultDataContent::Row, ResultDataContent::Graph],
        );
        let json = serde_json::to_value(&both).unwrap();
        let entry = &json["data"][0];
        assert_eq!(entry["row"][0]["id"], json!(7));
        assert_eq!(
            entry["graph"],
            json!({
                "nodes": [{"id": "7", "labels": ["Foo", "Bar"], "properties": {"name": "a"}}],
                "relationships": []
            })
        );

        let graph_only = ResultEntry::new(result.clone(), &[ResultDataContent::Graph]);
        let json = serde_json::to_value(&graph_only).unwrap();
        assert!(json["data"][0].get("row").is_none());
        assert!(graph_only.data[0].values().is_empty());

        let plain = ResultEntry::from(result);
        assert_eq!(plain.data[0].values().len(), 2);
        assert!(serde_json::to_value(&plain).unwrap()["data"][0].is_array());
    }

    #[test]
    fn test_error_response() {
        let response = TransactionResponse::error(
            StatusCode::NotFound,
            ErrorRecord::new(ErrorKind::InvalidTransactionId, "gone"),
        );
        assert_eq!(response.status.as_u16(), 404);
        assert!(response.body.results.is_empty());
        assert_eq!(response.body.error_codes(), vec![ErrorKind::InvalidTransactionId]);
        assert_eq!(response.status.to_string(), "404 Not Found");
    }
}
