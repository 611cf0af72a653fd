//! The seam between the ORM and a database driver.

use hashbrown::HashMap;
use serde_json::Value;

use crate::dialect::Dialect;
use crate::error::{Result, TesselError};
use crate::prelude::*;

/// One result row, keyed by the selected column name or alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// The value of `column`, treating a missing column as `null`.
    pub fn get_or_null(&self, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Identifier generated for the first inserted row, if the store reports one.
    pub first_insert_id: Option<i64>,
    pub affected_rows: u64,
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    Rows(Vec<Row>),
    Write(WriteResult),
}

impl StatementOutcome {
    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            StatementOutcome::Rows(rows) => Ok(rows),
            StatementOutcome::Write(_) => Err(TesselError::Query(
                "expected rows, the statement produced a write result".into(),
            )),
        }
    }

    pub fn into_write(self) -> Result<WriteResult> {
        match self {
            StatementOutcome::Write(result) => Ok(result),
            StatementOutcome::Rows(_) => Err(TesselError::Statement(
                "expected a write result, the statement produced rows".into(),
            )),
        }
    }
}

/// How a store allocates identifiers for a multi-row insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchIds {
    /// Unknown; rows are inserted one statement at a time.
    #[default]
    Unknown,
    /// The rows of one statement receive consecutive identifiers starting at
    /// [`WriteResult::first_insert_id`].
    Contiguous,
}

/// A database the ORM can run statements against.
///
/// Errors from the driver propagate unchanged.
#[allow(async_fn_in_trait)]
pub trait Store {
    const DIALECT: Dialect;

    async fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<StatementOutcome>;

    fn batch_ids(&self) -> BatchIds {
        BatchIds::Unknown
    }

    async fn begin(&self) -> Result<()> {
        self.execute_statement("BEGIN", &[]).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.execute_statement("COMMIT", &[]).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.execute_statement("ROLLBACK", &[]).await?;
        Ok(())
    }
}

impl<S: Store> Store for &S {
    const DIALECT: Dialect = S::DIALECT;

    async fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<StatementOutcome> {
        (**self).execute_statement(sql, params).await
    }

    fn batch_ids(&self) -> BatchIds {
        (**self).batch_ids()
    }

    async fn begin(&self) -> Result<()> {
        (**self).begin().await
    }

    async fn commit(&self) -> Result<()> {
        (**self).commit().await
    }

    async fn rollback(&self) -> Result<()> {
        (**self).rollback().await
    }
}
