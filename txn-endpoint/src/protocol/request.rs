// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Request body decoding
//!
//! The outer shape of a body (`{"statements": [...]}`) is checked up front so
//! that a malformed body is rejected before any transaction is touched.
//! Individual statement entries are only decoded when the batch reaches them.

use super::error::{json_type_name, StructuralError};
use crate::engine::{ResultDataContent, Statement, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum BatchEntry {
    Raw(serde_json::Value),
    Ready(Statement),
}

/// Ordered statements submitted in one request
#[derive(Debug, Clone, Default)]
pub struct StatementBatch {
    entries: Vec<BatchEntry>,
}

impl StatementBatch {
    /// An empty batch
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a request body
    ///
    /// An empty (or whitespace-only) body is an empty batch, as is an object
    /// without a `statements` member.
    pub fn parse(body: &[u8]) -> Result<Self, StructuralError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty());
        }

        let json: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| StructuralError::InvalidJson(e.to_string()))?;

        let mut object = match json {
            serde_json::Value::Object(object) => object,
            other => return Err(StructuralError::NotAnObject(json_type_name(&other))),
        };

        let entries = match object.remove("statements") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items.into_iter().map(BatchEntry::Raw).collect(),
            Some(_) => return Err(StructuralError::StatementsNotAList),
        };
        Ok(Self { entries })
    }

    /// Build a batch from already decoded statements
    pub fn from_statements(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            entries: statements.into_iter().map(BatchEntry::Ready).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statements in submission order, decoded on demand
    pub fn iter(&self) -> impl Iterator<Item = Result<Statement, StructuralError>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                BatchEntry::Ready(statement) => Ok(statement.clone()),
                BatchEntry::Raw(json) => decode_entry(index, json),
            })
    }
}

fn decode_entry(index: usize, json: &serde_json::Value) -> Result<Statement, StructuralError> {
    let invalid = |reason: String| StructuralError::InvalidStatement { index, reason };

    let object = json
        .as_object()
        .ok_or_else(|| invalid(format!("expected an object, found {}", json_type_name(json))))?;

    let text = match object.get("statement") {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => {
            return Err(invalid(format!(
                "expected `statement` to be a string, found {}",
                json_type_name(other)
            )))
        }
        None => return Err(invalid("missing `statement`".to_string())),
    };

    let parameters = match object.get("parameters") {
        None | Some(serde_json::Value::Null) => BTreeMap::new(),
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_json(value.clone())))
            .collect(),
        Some(other) => {
            return Err(invalid(format!(
                "expected `parameters` to be an object, found {}",
                json_type_name(other)
            )))
        }
    };

    let result_data_contents = match object.get("resultDataContents") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(name) => name.parse::<ResultDataContent>(),
                other => Err(format!(
                    "expected result data content names, found {}",
                    json_type_name(other)
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?,
        Some(other) => {
            return Err(invalid(format!(
                "expected `resultDataContents` to be a list, found {}",
                json_type_name(other)
            )))
        }
    };

    Ok(Statement {
        text,
        parameters,
        result_data_contents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bodies() {
        assert!(StatementBatch::parse(b"").unwrap().is_empty());
        assert!(StatementBatch::parse(b"  \n").unwrap().is_empty());
        assert!(StatementBatch::parse(b"{}").unwrap().is_empty());
        assert!(StatementBatch::parse(br#"{"statements":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            StatementBatch::parse(b"{\"statements\": ["),
            Err(StructuralError::InvalidJson(_))
        ));
        assert!(matches!(
            StatementBatch::parse(b"[]"),
            Err(StructuralError::NotAnObject("a list"))
        ));
        assert_eq!(
            StatementBatch::parse(br#"{"statements": "RETURN 1"}"#).unwrap_err(),
            StructuralError::StatementsNotAList
        );
    }

    #[test]
    fn test_entries_decode_lazily() {
        let batch = StatementBatch::parse(
            br#"{"statements": [
                {"statement": "RETURN $x", "parameters": {"x": 1}},
                {"statement": 42},
                {"parameters": {}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(batch.len(), 3);

        let entries: Vec<_> = batch.iter().collect();
        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.text, "RETURN $x");
        assert_eq!(first.parameters.get("x"), Some(&Value::Integer(1)));
        assert!(matches!(
            entries[1],
            Err(StructuralError::InvalidStatement { index: 1, .. })
        ));
        assert!(matches!(
            entries[2],
            Err(StructuralError::InvalidStatement { index: 2, .. })
        ));
    }

    #[test]
    fn test_result_data_contents() {
        let batch = StatementBatch::parse(
            br#"{"statements": [
                {"statement": "RETURN 1", "resultDataContents": ["row", "GRAPH"]},
                {"statement": "RETURN 1", "resultDataContents": null},
                {"statement": "RETURN 1", "resultDataContents": ["rest"]},
                {"statement": "RETURN 1", "resultDataContents": "row"}
            ]}"#,
        )
        .unwrap();

        let entries: Vec<_> = batch.iter().collect();
        assert_eq!(
            entries[0].as_ref().unwrap().result_data_contents,
            vec![ResultDataContent::Row, ResultDataContent::Graph]
        );
        assert!(entries[1].as_ref().unwrap().result_data_contents.is_empty());
        assert!(matches!(
            entries[2],
            Err(StructuralError::InvalidStatement { index: 2, .. })
        ));
        assert!(matches!(
            entries[3],
            Err(StructuralError::InvalidStatement { index: 3, .. })
        ));
    }

    #[test]
    fn test_from_statements() {
        let batch = StatementBatch::from_statements(vec![Statement::new("RETURN 1")]);
        let decoded: Vec<_> = batch.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, vec![Statement::new("RETURN 1")]);
    }
}
