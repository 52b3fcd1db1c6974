//! `PostgreSQL` driver.

use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, Row};

use super::{Driver, SqlParam, SqlValue};
use crate::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS studies (
    study_id   BIGSERIAL PRIMARY KEY,
    study_name TEXT NOT NULL UNIQUE,
    direction  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS trials (
    trial_id            BIGSERIAL PRIMARY KEY,
    study_id            BIGINT NOT NULL REFERENCES studies (study_id),
    number              BIGINT NOT NULL,
    state               TEXT NOT NULL,
    value               DOUBLE PRECISION,
    datetime_start      TEXT NOT NULL,
    datetime_complete   TEXT,
    params              TEXT NOT NULL,
    distributions       TEXT NOT NULL,
    intermediate_values TEXT NOT NULL,
    UNIQUE (study_id, number)
);
";

pub(super) struct PostgresDriver {
    client: Client,
}

impl PostgresDriver {
    /// Connect with a libpq-style `postgresql://` URL.
    pub(super) fn connect(url: &str) -> Result<Self> {
        let client = Client::connect(url, NoTls).map_err(Error::storage)?;
        Ok(Self { client })
    }
}

fn bind(param: &SqlParam) -> Box<dyn ToSql + Sync> {
    match param {
        SqlParam::Int(v) => Box::new(*v),
        SqlParam::Real(v) => Box::new(*v),
        SqlParam::Text(v) => Box::new(v.clone()),
    }
}

fn decode(row: &Row) -> Result<Vec<SqlValue>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let ty = col.type_();
            let cell = if *ty == Type::INT8 {
                row.try_get::<_, Option<i64>>(i)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Int))
            } else if *ty == Type::INT4 {
                row.try_get::<_, Option<i32>>(i)
                    .map(|v| v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))))
            } else if *ty == Type::FLOAT8 {
                row.try_get::<_, Option<f64>>(i)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Real))
            } else {
                row.try_get::<_, Option<String>>(i)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Text))
            };
            cell.map_err(Error::storage)
        })
        .collect()
}

impl Driver for PostgresDriver {
    fn schema(&self) -> &'static str {
        SCHEMA
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql).map_err(Error::storage)
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let bound: Vec<Box<dyn ToSql + Sync>> = params.iter().map(bind).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| &**b).collect();
        self.client.execute(sql, &refs).map_err(Error::storage)
    }

    fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Vec<SqlValue>>> {
        let bound: Vec<Box<dyn ToSql + Sync>> = params.iter().map(bind).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| &**b).collect();
        let rows = self.client.query(sql, &refs).map_err(Error::storage)?;
        rows.iter().map(decode).collect()
    }

    fn query_exclusive(
        &mut self,
        study_id: i64,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Vec<SqlValue>>> {
        let bound: Vec<Box<dyn ToSql + Sync>> = params.iter().map(bind).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| &**b).collect();

        let mut tx = self.client.transaction().map_err(Error::storage)?;
        // Row lock on the study; READ COMMITTED gives the next statement a
        // fresh snapshot that includes the previous holder's commit.
        tx.execute(
            "SELECT study_id FROM studies WHERE study_id = $1 FOR UPDATE",
            &[&study_id],
        )
        .map_err(Error::storage)?;
        let rows = tx.query(sql, &refs).map_err(Error::storage)?;
        let decoded = rows.iter().map(decode).collect::<Result<Vec<_>>>()?;
        tx.commit().map_err(Error::storage)?;
        Ok(decoded)
    }
}
