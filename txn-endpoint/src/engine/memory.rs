// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph engine implementation for testing
//!
//! Every transaction works on a private snapshot of the committed graph and
//! records a write log. Commit replays the log onto the committed graph,
//! rollback simply drops it, so nothing is visible outside the transaction
//! before it commits.

use super::error::{EngineError, StatementError};
use super::parser::{parse_statement, BinaryOp, Expr, MatchAction, NodePattern, Query, ReturnItem};
use super::value::{Node, Value};
use super::{EngineTransaction, Statement, StatementExecutor, StatementResult};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Committed graph contents
#[derive(Debug, Clone, Default)]
struct GraphStore {
    nodes: BTreeMap<u64, Node>,
}

#[derive(Debug, Clone)]
enum WriteOp {
    CreateNode(Node),
    DeleteNode(u64),
}

struct EngineState {
    committed: RwLock<GraphStore>,
    next_node_id: AtomicU64,
    open_transactions: AtomicUsize,
    max_open_transactions: Option<usize>,
    fail_next_commit: AtomicBool,
}

/// In-memory statement executor
///
/// Cloning is cheap and every clone shares the same committed graph.
#[derive(Clone)]
pub struct MemoryEngine {
    state: Arc<EngineState>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create an engine with an empty graph and no transaction limit
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an engine that refuses to open more than `limit` transactions at once
    pub fn with_max_open_transactions(limit: usize) -> Self {
        Self::build(Some(limit))
    }

    fn build(max_open_transactions: Option<usize>) -> Self {
        Self {
            state: Arc::new(EngineState {
                committed: RwLock::new(GraphStore::default()),
                next_node_id: AtomicU64::new(0),
                open_transactions: AtomicUsize::new(0),
                max_open_transactions,
                fail_next_commit: AtomicBool::new(false),
            }),
        }
    }

    /// Number of committed nodes
    pub fn node_count(&self) -> usize {
        self.state.committed.read().nodes.len()
    }

    /// Committed nodes ordered by id
    pub fn nodes(&self) -> Vec<Node> {
        self.state.committed.read().nodes.values().cloned().collect()
    }

    /// Look up a committed node
    pub fn node(&self, id: u64) -> Option<Node> {
        self.state.committed.read().nodes.get(&id).cloned()
    }

    /// Number of engine transactions that are neither committed nor rolled back
    pub fn open_transaction_count(&self) -> usize {
        self.state.open_transactions.load(Ordering::SeqCst)
    }

    /// Make the next commit fail after its statements have succeeded
    pub fn fail_next_commit(&self) {
        self.state.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl StatementExecutor for MemoryEngine {
    fn begin_transaction(&self) -> Result<Box<dyn EngineTransaction>, EngineError> {
        let open = self.state.open_transactions.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.state.max_open_transactions {
            if open >= limit {
                self.state.open_transactions.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::ResourceExhausted(format!(
                    "{} transactions already open",
                    open
                )));
            }
        }

        let snapshot = self.state.committed.read().clone();
        Ok(Box::new(MemoryTransaction {
            state: self.state.clone(),
            snapshot,
            writes: Vec::new(),
        }))
    }
}

/// Transaction against a [`MemoryEngine`]
pub struct MemoryTransaction {
    state: Arc<EngineState>,
    snapshot: GraphStore,
    writes: Vec<WriteOp>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.state.open_transactions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EngineTransaction for MemoryTransaction {
    fn execute(&mut self, statement: &Statement) -> Result<StatementResult, StatementError> {
        debug!("ENGINE: executing {:?}", statement.text);
        let query = parse_statement(&statement.text)?;
        let mut eval = Evaluator {
            parameters: &statement.parameters,
        };

        match query {
            Query::Create { patterns, returns } => self.create(&mut eval, patterns, returns),
            Query::Match {
                pattern,
                filter,
                action,
            } => {
                let wanted = match &filter {
                    Some(f) => {
                        if pattern.variable.as_deref() != Some(f.variable.as_str()) {
                            return Err(undefined_variable(&f.variable));
                        }
                        Some((f.key.clone(), eval.eval(&f.value, &BTreeMap::new())?))
                    }
                    None => None,
                };
                let matched = self.matching_nodes(&pattern, wanted.as_ref());
                match action {
                    MatchAction::Return(items) => eval.project_matches(&pattern, &matched, &items),
                    MatchAction::Delete(variable) => {
                        if pattern.variable.as_deref() != Some(variable.as_str()) {
                            return Err(undefined_variable(&variable));
                        }
                        for node in matched {
                            self.snapshot.nodes.remove(&node.id);
                            self.writes.push(WriteOp::DeleteNode(node.id));
                        }
                        Ok(StatementResult::empty())
                    }
                }
            }
            Query::Return { items } => {
                let row = eval.project_row(&items, &BTreeMap::new())?;
                Ok(StatementResult::new(columns_of(&items), vec![row]))
            }
        }
    }

    fn commit(self: Box<Self>) -> Result<(), EngineError> {
        if self.state.fail_next_commit.swap(false, Ordering::SeqCst) {
            warn!("ENGINE: injected commit failure, discarding {} writes", self.writes.len());
            return Err(EngineError::CommitFailed(
                "storage refused to apply the transaction".to_string(),
            ));
        }

        let mut committed = self.state.committed.write();
        for op in &self.writes {
            match op {
                WriteOp::CreateNode(node) => {
                    committed.nodes.insert(node.id, node.clone());
                }
                WriteOp::DeleteNode(id) => {
                    committed.nodes.remove(id);
                }
            }
        }
        debug!("ENGINE: committed {} writes", self.writes.len());
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!("ENGINE: rolled back, discarding {} writes", self.writes.len());
    }
}

impl MemoryTransaction {
    fn create(
        &mut self,
        eval: &mut Evaluator<'_>,
        patterns: Vec<NodePattern>,
        returns: Vec<ReturnItem>,
    ) -> Result<StatementResult, StatementError> {
        let mut bindings = BTreeMap::new();
        let mut created = Vec::with_capacity(patterns.len());

        for pattern in &patterns {
            let mut properties = BTreeMap::new();
            for (key, expr) in &pattern.properties {
                let value = eval.eval(expr, &bindings)?;
                if !value.is_null() {
                    properties.insert(key.clone(), value);
                }
            }
            let id = self.state.next_node_id.fetch_add(1, Ordering::SeqCst);
            let node = Node::new(id, pattern.labels.clone(), properties);

            if let Some(variable) = &pattern.variable {
                if bindings
                    .insert(variable.clone(), Value::Node(node.clone()))
                    .is_some()
                {
                    return Err(StatementError::Syntax(format!(
                        "Variable `{}` already declared",
                        variable
                    )));
                }
            }
            created.push(node);
        }

        let result = if returns.is_empty() {
            StatementResult::empty()
        } else {
            let row = eval.project_row(&returns, &bindings)?;
            StatementResult::new(columns_of(&returns), vec![row])
        };

        for node in created {
            self.snapshot.nodes.insert(node.id, node.clone());
            self.writes.push(WriteOp::CreateNode(node));
        }
        Ok(result)
    }

    fn matching_nodes(&self, pattern: &NodePattern, wanted: Option<&(String, Value)>) -> Vec<Node> {
        self.snapshot
            .nodes
            .values()
            .filter(|node| node.has_labels(&pattern.labels))
            .filter(|node| match wanted {
                Some((key, value)) => node.property(key).loosely_equals(value),
                None => true,
            })
            .cloned()
            .collect()
    }
}

fn columns_of(items: &[ReturnItem]) -> Vec<String> {
    items.iter().map(|item| item.column.clone()).collect()
}

fn undefined_variable(name: &str) -> StatementError {
    StatementError::Syntax(format!("Variable `{}` not defined", name))
}

/// Expression evaluation against bound parameters
struct Evaluator<'a> {
    parameters: &'a BTreeMap<String, Value>,
}

impl Evaluator<'_> {
    fn project_row(
        &mut self,
        items: &[ReturnItem],
        bindings: &BTreeMap<String, Value>,
    ) -> Result<Vec<Value>, StatementError> {
        items
            .iter()
            .map(|item| self.eval(&item.expr, bindings))
            .collect()
    }

    fn project_matches(
        &mut self,
        pattern: &NodePattern,
        matched: &[Node],
        items: &[ReturnItem],
    ) -> Result<StatementResult, StatementError> {
        let columns = columns_of(items);
        let aggregates = items.iter().filter(|item| item.expr.is_aggregate()).count();

        if aggregates > 0 {
            if aggregates != items.len() {
                return Err(StatementError::Syntax(
                    "Mixing aggregate and non-aggregate return items is not supported".to_string(),
                ));
            }
            let row = items
                .iter()
                .map(|item| match &item.expr {
                    Expr::Count(variable) if pattern.variable.as_deref() == Some(variable) => {
                        Ok(Value::Integer(matched.len() as i64))
                    }
                    Expr::Count(variable) => Err(undefined_variable(variable)),
                    other => Err(StatementError::Syntax(format!(
                        "Unsupported aggregate {:?}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(StatementResult::new(columns, vec![row]));
        }

        let mut rows = Vec::with_capacity(matched.len());
        for node in matched {
            let mut bindings = BTreeMap::new();
            if let Some(variable) = &pattern.variable {
                bindings.insert(variable.clone(), Value::Node(node.clone()));
            }
            rows.push(self.project_row(items, &bindings)?);
        }
        Ok(StatementResult::new(columns, rows))
    }

    fn eval(
        &mut self,
        expr: &Expr,
        bindings: &BTreeMap<String, Value>,
    ) -> Result<Value, StatementError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Parameter(name) => self
                .parameters
                .get(name)
                .cloned()
                .ok_or_else(|| StatementError::ParameterMissing(name.clone())),
            Expr::Variable(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| undefined_variable(name)),
            Expr::Property(name, key) => match bindings.get(name) {
                Some(Value::Node(node)) => Ok(node.property(key)),
                Some(Value::Map(map)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
                Some(Value::Null) => Ok(Value::Null),
                Some(other) => Err(StatementError::Type(format!(
                    "Type mismatch: expected a node or map but was {}",
                    other.type_name()
                ))),
                None => Err(undefined_variable(name)),
            },
            Expr::Count(_) => Err(StatementError::Syntax(
                "count() is only supported in MATCH ... RETURN".to_string(),
            )),
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item, bindings))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, item) in entries {
                    map.insert(key.clone(), self.eval(item, bindings)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Binary(left, op, right) => {
                let left = self.eval(left, bindings)?;
                let right = self.eval(right, bindings)?;
                apply_binary(left, *op, right)
            }
        }
    }
}

fn apply_binary(left: Value, op: BinaryOp, right: Value) -> Result<Value, StatementError> {
    use Value::*;

    let overflow = || StatementError::Runtime("integer overflow".to_string());

    match (left, op, right) {
        (Null, _, _) | (_, _, Null) => Ok(Null),
        (Integer(_), BinaryOp::Divide, Integer(0)) => {
            Err(StatementError::Runtime("/ by zero".to_string()))
        }
        (Integer(a), op, Integer(b)) => match op {
            BinaryOp::Add => a.checked_add(b).map(Integer).ok_or_else(overflow),
            BinaryOp::Subtract => a.checked_sub(b).map(Integer).ok_or_else(overflow),
            BinaryOp::Multiply => a.checked_mul(b).map(Integer).ok_or_else(overflow),
            BinaryOp::Divide => a.checked_div(b).map(Integer).ok_or_else(overflow),
        },
        (left @ (Integer(_) | Float(_)), op, right @ (Integer(_) | Float(_))) => {
            let a = as_float(&left);
            let b = as_float(&right);
            match op {
                BinaryOp::Add => Ok(Float(a + b)),
                BinaryOp::Subtract => Ok(Float(a - b)),
                BinaryOp::Multiply => Ok(Float(a * b)),
                BinaryOp::Divide if b == 0.0 => {
                    Err(StatementError::Runtime("/ by zero".to_string()))
                }
                BinaryOp::Divide => Ok(Float(a / b)),
            }
        }
        (String(a), BinaryOp::Add, String(b)) => Ok(String(a + &b)),
        (List(mut a), BinaryOp::Add, List(b)) => {
            a.extend(b);
            Ok(List(a))
        }
        (left, op, right) => Err(StatementError::Type(format!(
            "Cannot apply '{}' to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Integer(i) => *i as f64,
        Value::Float(x) => *x,
        _ => f64::NAN,
    }
}
