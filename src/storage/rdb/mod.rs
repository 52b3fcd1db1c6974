//! Relational storage backend.
//!
//! One SQL layer shared by two drivers: `SQLite` through `rusqlite` and
//! `PostgreSQL` through `postgres`. Statements are written with `$n`
//! placeholders; the `SQLite` driver rewrites them to `?n`.

#[cfg(feature = "postgres")]
mod pg;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::collections::BTreeMap;
use std::vec::IntoIter;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{Storage, StudyId, StudyRecord};
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::sampler::FrozenTrial;
use crate::types::{Direction, TrialState};

/// A bound statement parameter. Nullable columns carry their type so that
/// `PostgreSQL` can check a `NULL` against the column.
#[allow(dead_code)]
pub(crate) enum SqlParam {
    Int(i64),
    Real(Option<f64>),
    Text(Option<String>),
}

/// A decoded result cell.
#[allow(dead_code)]
pub(crate) enum SqlValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    fn into_i64(self) -> Result<i64> {
        match self {
            Self::Int(v) => Ok(v),
            _ => Err(Error::Storage("expected an integer column".to_string())),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn into_opt_f64(self) -> Result<Option<f64>> {
        match self {
            Self::Null => Ok(None),
            Self::Real(v) => Ok(Some(v)),
            Self::Int(v) => Ok(Some(v as f64)),
            Self::Text(_) => Err(Error::Storage("expected a numeric column".to_string())),
        }
    }

    fn into_opt_string(self) -> Result<Option<String>> {
        match self {
            Self::Null => Ok(None),
            Self::Text(v) => Ok(Some(v)),
            _ => Err(Error::Storage("expected a text column".to_string())),
        }
    }

    fn into_string(self) -> Result<String> {
        self.into_opt_string()?
            .ok_or_else(|| Error::Storage("unexpected NULL in text column".to_string()))
    }
}

/// The minimal surface a database driver provides.
pub(crate) trait Driver: Send {
    /// DDL creating the schema if it does not exist.
    fn schema(&self) -> &'static str;
    fn execute_batch(&mut self, sql: &str) -> Result<()>;
    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64>;
    fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Vec<Vec<SqlValue>>>;
    /// Run `sql` in its own transaction that holds the write lock on study
    /// `study_id` (`PostgreSQL`) or on the database (`SQLite`) from the start.
    /// Concurrent callers for the same study run one after another.
    fn query_exclusive(
        &mut self,
        study_id: i64,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Vec<SqlValue>>>;
}

/// A storage backend on a relational database.
///
/// The handle owns one connection, guarded by a mutex. Other processes may
/// write to the same database concurrently; every read goes to the database.
///
/// # Examples
///
/// ```no_run
/// use docktuna::storage::RdbStorage;
///
/// let local = RdbStorage::open("sqlite:///tmp/studies.db").unwrap();
/// let shared = RdbStorage::open("postgresql+psycopg2://tuner:pw@db/tuning").unwrap();
/// ```
pub struct RdbStorage {
    driver: Mutex<Box<dyn Driver>>,
    backend: &'static str,
}

impl core::fmt::Debug for RdbStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RdbStorage")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl RdbStorage {
    /// Connect to the database named by `url` and create the schema if needed.
    ///
    /// Accepted forms:
    ///
    /// - `postgresql://…`, `postgres://…`, or `postgresql+<driver>://…`
    ///   (the driver suffix is ignored);
    /// - `sqlite:///absolute/path.db`, `sqlite://relative.db`, `sqlite://:memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`] for other schemes (or when the
    /// matching feature is disabled) and [`Error::Storage`] when the driver
    /// cannot connect or create the schema.
    pub fn open(url: &str) -> Result<Self> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(Error::UnsupportedScheme("<missing scheme>".to_string()));
        };
        let base = scheme.split_once('+').map_or(scheme, |(base, _)| base);

        let (driver, backend): (Box<dyn Driver>, &'static str) = match base {
            #[cfg(feature = "sqlite")]
            "sqlite" => (Box::new(sqlite::SqliteDriver::open(rest)?), "sqlite"),
            #[cfg(feature = "postgres")]
            "postgresql" | "postgres" => (
                Box::new(pg::PostgresDriver::connect(&format!(
                    "postgresql://{rest}"
                ))?),
                "postgresql",
            ),
            _ => {
                let _ = rest;
                return Err(Error::UnsupportedScheme(scheme.to_string()));
            }
        };

        let storage = Self {
            driver: Mutex::new(driver),
            backend,
        };
        storage.init_schema()?;
        trace_debug!(backend, "relational storage opened");
        Ok(storage)
    }

    /// The backend family behind this handle (`"sqlite"` or `"postgresql"`).
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    fn init_schema(&self) -> Result<()> {
        let mut driver = self.driver.lock();
        let schema = driver.schema();
        driver.execute_batch(schema)
    }

    fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Vec<SqlValue>>> {
        self.driver.lock().query(sql, params)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::storage)
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(Error::storage)
}

/// Intermediate values as a JSON array of `[step, value]` pairs. JSON numbers
/// cannot hold NaN or infinities, so those are written as `"nan"`, `"inf"`
/// and `"-inf"`.
fn encode_intermediate(values: &[(u64, f64)]) -> Result<String> {
    let cells: Vec<(u64, serde_json::Value)> = values
        .iter()
        .map(|&(step, value)| {
            let cell = serde_json::Number::from_f64(value).map_or_else(
                || serde_json::Value::String(non_finite_token(value).to_string()),
                serde_json::Value::Number,
            );
            (step, cell)
        })
        .collect();
    to_json(&cells)
}

fn non_finite_token(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn decode_intermediate(text: &str) -> Result<Vec<(u64, f64)>> {
    let cells: Vec<(u64, serde_json::Value)> = from_json(text)?;
    cells
        .into_iter()
        .map(|(step, cell)| {
            let value = match cell {
                serde_json::Value::Number(n) => n.as_f64(),
                // Plain `serde_json` output for a non-finite float.
                serde_json::Value::Null => Some(f64::NAN),
                serde_json::Value::String(token) => match token.as_str() {
                    "nan" => Some(f64::NAN),
                    "inf" => Some(f64::INFINITY),
                    "-inf" => Some(f64::NEG_INFINITY),
                    _ => None,
                },
                _ => None,
            };
            value.map(|v| (step, v)).ok_or_else(|| {
                Error::Storage(format!("invalid intermediate value at step {step}"))
            })
        })
        .collect()
}

fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(Error::storage)
}

fn column(cols: &mut IntoIter<SqlValue>) -> Result<SqlValue> {
    cols.next()
        .ok_or_else(|| Error::Storage("result row is missing a column".to_string()))
}

fn decode_trial(row: Vec<SqlValue>) -> Result<FrozenTrial> {
    let mut cols = row.into_iter();
    let number = column(&mut cols)?.into_i64()?;
    let state = TrialState::parse(&column(&mut cols)?.into_string()?)?;
    let value = column(&mut cols)?.into_opt_f64()?;
    let datetime_start = parse_time(&column(&mut cols)?.into_string()?)?;
    let datetime_complete = column(&mut cols)?
        .into_opt_string()?
        .map(|t| parse_time(&t))
        .transpose()?;
    let params: BTreeMap<String, ParamValue> = from_json(&column(&mut cols)?.into_string()?)?;
    let distributions: BTreeMap<String, Distribution> =
        from_json(&column(&mut cols)?.into_string()?)?;
    let intermediate_values = decode_intermediate(&column(&mut cols)?.into_string()?)?;

    Ok(FrozenTrial {
        number: u64::try_from(number).map_err(Error::storage)?,
        state,
        value,
        params,
        distributions,
        intermediate_values,
        datetime_start,
        datetime_complete,
    })
}

fn trial_number(number: u64) -> Result<i64> {
    i64::try_from(number).map_err(Error::storage)
}

impl Storage for RdbStorage {
    fn create_study(&self, name: &str, direction: Direction) -> Result<StudyId> {
        if self.study_id_from_name(name)?.is_some() {
            return Err(Error::DuplicatedStudy(name.to_string()));
        }
        let inserted = self.query(
            "INSERT INTO studies (study_name, direction) VALUES ($1, $2) RETURNING study_id",
            &[
                SqlParam::Text(Some(name.to_string())),
                SqlParam::Text(Some(direction.as_str().to_string())),
            ],
        );
        match inserted {
            Ok(rows) => {
                let row = rows
                    .into_iter()
                    .next()
                    .ok_or(Error::Internal("INSERT RETURNING produced no row"))?;
                let id = column(&mut row.into_iter())?.into_i64()?;
                Ok(StudyId(id))
            }
            // Another process may have won the race for this name.
            Err(e) => match self.study_id_from_name(name) {
                Ok(Some(_)) => Err(Error::DuplicatedStudy(name.to_string())),
                _ => Err(e),
            },
        }
    }

    fn study_id_from_name(&self, name: &str) -> Result<Option<StudyId>> {
        let rows = self.query(
            "SELECT study_id FROM studies WHERE study_name = $1",
            &[SqlParam::Text(Some(name.to_string()))],
        )?;
        rows.into_iter()
            .next()
            .map(|row| column(&mut row.into_iter())?.into_i64().map(StudyId))
            .transpose()
    }

    fn study_direction(&self, study_id: StudyId) -> Result<Direction> {
        let rows = self.query(
            "SELECT direction FROM studies WHERE study_id = $1",
            &[SqlParam::Int(study_id.0)],
        )?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::StudyNotFound(format!("with id {study_id}")))?;
        Direction::parse(&column(&mut row.into_iter())?.into_string()?)
    }

    fn list_studies(&self) -> Result<Vec<StudyRecord>> {
        let rows = self.query(
            "SELECT study_id, study_name, direction FROM studies ORDER BY study_id",
            &[],
        )?;
        rows.into_iter()
            .map(|row| {
                let mut cols = row.into_iter();
                Ok(StudyRecord {
                    id: StudyId(column(&mut cols)?.into_i64()?),
                    name: column(&mut cols)?.into_string()?,
                    direction: Direction::parse(&column(&mut cols)?.into_string()?)?,
                })
            })
            .collect()
    }

    /// Numbers are `COUNT(*)` of the study's trials, taken while holding the
    /// study's write lock, so concurrent workers never draw the same number.
    fn create_trial(&self, study_id: StudyId) -> Result<FrozenTrial> {
        self.study_direction(study_id)?;
        let start = Utc::now();
        let rows = self.driver.lock().query_exclusive(
            study_id.0,
            "INSERT INTO trials (study_id, number, state, datetime_start, params, distributions, intermediate_values) \
             SELECT CAST($1 AS BIGINT), COUNT(*), 'RUNNING', $2, '{}', '{}', '[]' \
             FROM trials WHERE study_id = $1 \
             RETURNING number",
            &[
                SqlParam::Int(study_id.0),
                SqlParam::Text(Some(start.to_rfc3339())),
            ],
        )?;
        let row = rows
            .into_iter()
            .next()
            .ok_or(Error::Internal("INSERT RETURNING produced no row"))?;
        let number = column(&mut row.into_iter())?.into_i64()?;
        Ok(FrozenTrial::running(
            u64::try_from(number).map_err(Error::storage)?,
            start,
        ))
    }

    fn finish_trial(&self, study_id: StudyId, trial: &FrozenTrial) -> Result<()> {
        let updated = self.driver.lock().execute(
            "UPDATE trials SET state = $1, value = $2, datetime_complete = $3, \
             params = $4, distributions = $5, intermediate_values = $6 \
             WHERE study_id = $7 AND number = $8",
            &[
                SqlParam::Text(Some(trial.state.as_str().to_string())),
                SqlParam::Real(trial.value),
                SqlParam::Text(trial.datetime_complete.map(|t| t.to_rfc3339())),
                SqlParam::Text(Some(to_json(&trial.params)?)),
                SqlParam::Text(Some(to_json(&trial.distributions)?)),
                SqlParam::Text(Some(encode_intermediate(&trial.intermediate_values)?)),
                SqlParam::Int(study_id.0),
                SqlParam::Int(trial_number(trial.number)?),
            ],
        )?;
        if updated == 0 {
            return Err(Error::Storage(format!(
                "trial {} of study {study_id} does not exist",
                trial.number
            )));
        }
        Ok(())
    }

    fn trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>> {
        let rows = self.query(
            "SELECT number, state, value, datetime_start, datetime_complete, \
             params, distributions, intermediate_values \
             FROM trials WHERE study_id = $1 ORDER BY number",
            &[SqlParam::Int(study_id.0)],
        )?;
        rows.into_iter().map(decode_trial).collect()
    }
}
