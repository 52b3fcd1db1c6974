//! `SQLite` driver.

use core::time::Duration;

use rusqlite::types::Value;
use rusqlite::{Connection, TransactionBehavior, params_from_iter};

use super::{Driver, SqlParam, SqlValue};
use crate::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS studies (
    study_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    study_name TEXT NOT NULL UNIQUE,
    direction  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS trials (
    trial_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    study_id            INTEGER NOT NULL REFERENCES studies (study_id),
    number              INTEGER NOT NULL,
    state               TEXT NOT NULL,
    value               REAL,
    datetime_start      TEXT NOT NULL,
    datetime_complete   TEXT,
    params              TEXT NOT NULL,
    distributions       TEXT NOT NULL,
    intermediate_values TEXT NOT NULL,
    UNIQUE (study_id, number)
);
";

pub(super) struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open the database at `path` (`:memory:` for a private in-memory one).
    pub(super) fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(Error::storage)?;

        // WAL mode: concurrent readers, single writer.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(Error::storage)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(Error::storage)?;

        Ok(Self { conn })
    }
}

/// `$n` placeholders become `?n`.
fn rewrite(sql: &str) -> String {
    sql.replace('$', "?")
}

fn bind(param: &SqlParam) -> Value {
    match param {
        SqlParam::Int(v) => Value::Integer(*v),
        SqlParam::Real(Some(v)) => Value::Real(*v),
        SqlParam::Text(Some(v)) => Value::Text(v.clone()),
        SqlParam::Real(None) | SqlParam::Text(None) => Value::Null,
    }
}

fn decode(value: Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Integer(v) => Ok(SqlValue::Int(v)),
        Value::Real(v) => Ok(SqlValue::Real(v)),
        Value::Text(v) => Ok(SqlValue::Text(v)),
        Value::Blob(_) => Err(Error::Storage("unexpected BLOB column".to_string())),
    }
}

impl Driver for SqliteDriver {
    fn schema(&self) -> &'static str {
        SCHEMA
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(Error::storage)
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let changed = self
            .conn
            .execute(&rewrite(sql), params_from_iter(params.iter().map(bind)))
            .map_err(Error::storage)?;
        Ok(changed as u64)
    }

    fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Vec<SqlValue>>> {
        query_rows(&self.conn, sql, params)
    }

    /// `SQLite` locks the whole database; `BEGIN IMMEDIATE` takes the write
    /// lock up front and waits out other writers through the busy timeout.
    fn query_exclusive(
        &mut self,
        _study_id: i64,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Vec<SqlValue>>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::storage)?;
        let rows = query_rows(&tx, sql, params)?;
        tx.commit().map_err(Error::storage)?;
        Ok(rows)
    }
}

fn query_rows(conn: &Connection, sql: &str, params: &[SqlParam]) -> Result<Vec<Vec<SqlValue>>> {
    let mut stmt = conn.prepare(&rewrite(sql)).map_err(Error::storage)?;
    let n_cols = stmt.column_count();
    let rows = stmt
        .query_map(params_from_iter(params.iter().map(bind)), |row| {
            (0..n_cols)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(Error::storage)?;

    let mut out = Vec::new();
    for row in rows {
        let row = row.map_err(Error::storage)?;
        out.push(row.into_iter().map(decode).collect::<Result<Vec<_>>>()?);
    }
    Ok(out)
}
