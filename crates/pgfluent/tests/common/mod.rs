//! In-memory driver that records every call it receives.

#![allow(dead_code)]

use pgfluent::{Driver, OrmError, OrmResult, PreparedStatement, Record, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Prepare(String),
    Execute { sql: String, params: Vec<Value> },
    Begin,
    Commit,
    Rollback,
    Columns(String),
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<Call>,
    rows: Vec<Record>,
    rows_affected: Option<u64>,
    columns: Vec<String>,
    fail_prepare: bool,
    fail_execute: bool,
}

/// Driver double: records SQL and parameters, returns canned rows.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows handed back by every `execute`.
    pub fn with_rows(self, rows: Vec<Record>) -> Self {
        self.inner.lock().unwrap().rows = rows;
        self
    }

    /// Affected-row count reported by `execute` (defaults to the row count).
    pub fn with_rows_affected(self, n: u64) -> Self {
        self.inner.lock().unwrap().rows_affected = Some(n);
        self
    }

    pub fn with_columns(self, columns: &[&str]) -> Self {
        self.inner.lock().unwrap().columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn fail_prepare(&self, fail: bool) {
        self.inner.lock().unwrap().fail_prepare = fail;
    }

    pub fn fail_execute(&self, fail: bool) {
        self.inner.lock().unwrap().fail_execute = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// `(sql, params)` of every executed statement, in order.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute { sql, params } => Some((sql, params)),
                _ => None,
            })
            .collect()
    }

    pub fn last_executed(&self) -> Option<(String, Vec<Value>)> {
        self.executed().pop()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

pub struct RecordingStatement<'a> {
    driver: &'a RecordingDriver,
    sql: String,
    rows: Vec<Record>,
}

impl PreparedStatement for RecordingStatement<'_> {
    async fn execute(&mut self, params: &[Value]) -> OrmResult<u64> {
        self.driver.record(Call::Execute {
            sql: self.sql.clone(),
            params: params.to_vec(),
        });

        let inner = self.driver.inner.lock().unwrap();
        if inner.fail_execute {
            return Err(OrmError::Other("execute failed".to_string()));
        }
        self.rows = inner.rows.clone();
        Ok(inner.rows_affected.unwrap_or(self.rows.len() as u64))
    }

    fn fetch_all(&mut self) -> OrmResult<Vec<Record>> {
        Ok(std::mem::take(&mut self.rows))
    }
}

impl Driver for RecordingDriver {
    type Statement<'a> = RecordingStatement<'a>;

    async fn prepare<'a>(&'a self, sql: &str) -> OrmResult<RecordingStatement<'a>> {
        self.record(Call::Prepare(sql.to_string()));
        if self.inner.lock().unwrap().fail_prepare {
            return Err(OrmError::Connection("prepare failed".to_string()));
        }
        Ok(RecordingStatement {
            driver: self,
            sql: sql.to_string(),
            rows: Vec::new(),
        })
    }

    async fn begin_transaction(&self) -> OrmResult<()> {
        self.record(Call::Begin);
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        self.record(Call::Commit);
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        self.record(Call::Rollback);
        Ok(())
    }

    async fn columns_of(&self, table: &str) -> OrmResult<Vec<String>> {
        self.record(Call::Columns(table.to_string()));
        Ok(self.inner.lock().unwrap().columns.clone())
    }
}
