//! [`Store`] over a `rusqlite` connection.

use rusqlite::{Connection, params_from_iter};
use serde_json::Value;
use tessel_core::{BatchIds, Dialect, Result, Row, StatementOutcome, Store, WriteResult};

use crate::connection::SQLiteTransactionType;
use crate::values::SQLiteValue;

/// SQLite store backed by one `rusqlite` connection.
///
/// ```
/// use tessel_sqlite::SqliteStore;
///
/// let store = SqliteStore::open_in_memory()?.assume_contiguous_ids(true);
/// assert!(store.connection().is_autocommit());
/// # Ok::<(), tessel_core::TesselError>(())
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    transaction_type: SQLiteTransactionType,
    contiguous_ids: bool,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            transaction_type: SQLiteTransactionType::default(),
            contiguous_ids: false,
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Sets how transactions opened by [`Store::begin`] acquire locks.
    pub fn with_transaction_type(mut self, transaction_type: SQLiteTransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    /// Declares that the rows of one multi-row insert receive consecutive rowids.
    ///
    /// Only sound while no other connection writes to the same tables.
    pub fn assume_contiguous_ids(mut self, enabled: bool) -> Self {
        self.contiguous_ids = enabled;
        self
    }

    pub fn transaction_type(&self) -> SQLiteTransactionType {
        self.transaction_type
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<StatementOutcome> {
        let params = params
            .iter()
            .map(SQLiteValue::try_from)
            .collect::<Result<Vec<_>>>()?;
        let mut stmt = self.conn.prepare(sql)?;

        if stmt.column_count() > 0 {
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = Row::new();
                for (i, column) in columns.iter().enumerate() {
                    let value = SQLiteValue::from(row.get_ref(i)?);
                    values.insert(column.as_str(), Value::from(value));
                }
                out.push(values);
            }
            return Ok(StatementOutcome::Rows(out));
        }

        let affected = stmt.execute(params_from_iter(params.iter()))? as u64;
        let first_insert_id = (is_insert(sql) && affected > 0)
            .then(|| self.conn.last_insert_rowid() - (affected as i64 - 1));

        Ok(StatementOutcome::Write(WriteResult {
            first_insert_id,
            affected_rows: affected,
        }))
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("INSERT"))
}

impl Store for SqliteStore {
    const DIALECT: Dialect = Dialect::SQLite;

    async fn execute_statement(&self, sql: &str, params: &[Value]) -> Result<StatementOutcome> {
        tessel_core::tessel_profile_scope!("sqlite", "execute_statement");
        self.run(sql, params)
    }

    fn batch_ids(&self) -> BatchIds {
        if self.contiguous_ids {
            BatchIds::Contiguous
        } else {
            BatchIds::Unknown
        }
    }

    async fn begin(&self) -> Result<()> {
        tessel_core::tessel_trace_tx!("begin", "sqlite.rusqlite");
        self.conn.execute_batch(self.transaction_type.begin_sql())?;
        Ok(())
    }
}
