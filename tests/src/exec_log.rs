use crate::logging_driver::DriverOp;
use orma::driver::{operation::Transaction, Operation, Response};
use std::sync::{Arc, Mutex};

/// A wrapper around the operations log that provides a clean API for tests
pub struct ExecLog {
    ops: Arc<Mutex<Vec<DriverOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<DriverOp>>>) -> Self {
        Self { ops }
    }

    /// Get the number of logged operations
    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// SQL text of every logged statement, in execution order
    pub fn sql(&self) -> Vec<String> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| op.operation.as_query_sql())
            .map(|query| query.sql.clone())
            .collect()
    }

    /// Count statements whose SQL starts with `keyword`
    pub fn count(&self, keyword: &str) -> usize {
        self.sql()
            .iter()
            .filter(|sql| sql.starts_with(keyword))
            .count()
    }

    pub fn selects(&self) -> usize {
        self.count("SELECT")
    }

    pub fn inserts(&self) -> usize {
        self.count("INSERT")
    }

    pub fn updates(&self) -> usize {
        self.count("UPDATE")
    }

    pub fn deletes(&self) -> usize {
        self.count("DELETE")
    }

    /// Transaction operations, in execution order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op.operation {
                Operation::Transaction(transaction) => Some(transaction),
                _ => None,
            })
            .collect()
    }

    /// Clear the log
    pub fn clear(&mut self) {
        self.ops.lock().unwrap().clear();
    }

    /// Remove and return the first operation from the log
    /// Returns None if the log is empty
    pub fn pop(&mut self) -> Option<(Operation, Response)> {
        let mut ops = self.ops.lock().unwrap();
        if ops.is_empty() {
            None
        } else {
            let driver_op = ops.remove(0);
            Some((driver_op.operation, driver_op.response))
        }
    }

    /// Remove the first operation and return its SQL text
    #[track_caller]
    pub fn pop_sql(&mut self) -> String {
        match self.pop() {
            Some((Operation::QuerySql(query), _)) => query.sql,
            other => panic!("expected a SQL statement; got {other:#?}"),
        }
    }
}
