//! Engine double that records when statements start and finish
//!
//! Each statement logs `enter:<text>` when it starts and `exit:<text>` when it
//! finishes, sleeping in between. If two requests ever ran statements of the
//! same transaction at once, their entries would interleave in the log.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use txn_endpoint::{
    EngineError, EngineTransaction, Statement, StatementError, StatementExecutor,
    StatementResult, Value,
};

#[derive(Clone)]
pub struct RecordingExecutor {
    events: Arc<Mutex<Vec<String>>>,
    statement_time: Duration,
}

impl RecordingExecutor {
    pub fn new(statement_time: Duration) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            statement_time,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Whether every `enter` is immediately followed by its own `exit`
    pub fn is_serialized(&self) -> bool {
        let events = self.events();
        events.chunks(2).all(|pair| match pair {
            [enter, exit] => {
                enter.strip_prefix("enter:").is_some()
                    && enter.strip_prefix("enter:") == exit.strip_prefix("exit:")
            }
            _ => false,
        })
    }
}

impl StatementExecutor for RecordingExecutor {
    fn begin_transaction(&self) -> Result<Box<dyn EngineTransaction>, EngineError> {
        Ok(Box::new(RecordingTransaction {
            events: self.events.clone(),
            statement_time: self.statement_time,
        }))
    }
}

struct RecordingTransaction {
    events: Arc<Mutex<Vec<String>>>,
    statement_time: Duration,
}

impl EngineTransaction for RecordingTransaction {
    fn execute(&mut self, statement: &Statement) -> Result<StatementResult, StatementError> {
        self.events.lock().push(format!("enter:{}", statement.text));
        std::thread::sleep(self.statement_time);
        self.events.lock().push(format!("exit:{}", statement.text));
        Ok(StatementResult::new(
            vec!["statement".to_string()],
            vec![vec![Value::from(statement.text.as_str())]],
        ))
    }

    fn commit(self: Box<Self>) -> Result<(), EngineError> {
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}
