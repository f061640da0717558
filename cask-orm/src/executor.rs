//! # Execution Engine
//!
//! `SqlMapper` resolves statements by id, binds caller parameters, runs the
//! SQL through whatever `Connection` the caller supplies, and maps rows back
//! into objects. Every call is self-contained and synchronous from the
//! caller's point of view; the engine adds no threading of its own.
//!
//! Select-key ordering is the one hard invariant here: a `Pre` key runs
//! before its parent insert and feeds the insert's parameters, a `Post` key
//! runs after it and never runs at all when the insert fails.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::database::Connection;
use crate::error::Error;
use crate::row::{FromRow, Row};
use crate::sqlmap::SqlMap;
use crate::statement::{KeyMode, SelectKey, SelectStatement, Statement};
use crate::value::{Params, Value};

// ============================================================================
// Outcomes
// ============================================================================

/// What an insert produced.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// Rows affected by the insert itself.
    pub rows_affected: u64,
    /// The database-generated key, when the statement carries a select key.
    pub generated_key: Option<Value>,
}

// ============================================================================
// SqlMapper
// ============================================================================

/// The execution engine over an immutable [`SqlMap`].
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone)]
pub struct SqlMapper {
    map: Arc<SqlMap>,
}

impl SqlMapper {
    pub fn new(map: SqlMap) -> Self {
        Self { map: Arc::new(map) }
    }

    pub fn sql_map(&self) -> &SqlMap {
        &self.map
    }

    fn statement(&self, id: &str) -> Result<&Statement, Error> {
        self.map
            .get(id)
            .ok_or_else(|| Error::StatementNotFound(id.to_string()))
    }

    /// Runs an insert statement.
    ///
    /// A `Pre` select key executes first and its scalar result joins the
    /// parameter set under the key's property; a `Post` select key executes
    /// after the insert succeeded. Either way the retrieved key comes back
    /// in the outcome for the caller to apply to its own object.
    pub async fn insert<C>(&self, conn: &C, id: &str, params: &Params) -> Result<InsertOutcome, Error>
    where
        C: Connection + ?Sized,
    {
        let statement = match self.statement(id)? {
            Statement::Insert(s) => s,
            other => return Err(kind_error(id, "an insert", other)),
        };

        let mut params = params.clone();
        let mut generated_key = None;

        if let Some(key) = statement.select_key() {
            if key.mode() == KeyMode::Pre {
                let value = self.select_key_value(conn, id, key, &params).await?;
                params.set(key.property().to_string(), value.clone());
                generated_key = Some(value);
            }
        }

        let bound = statement
            .sql()
            .bind(conn.driver(), &params, statement.parameters(), id)?;
        log::debug!("insert `{id}`: {}", bound.sql);
        log::trace!("insert `{id}` values: {:?}", bound.values);
        let rows_affected = conn
            .execute(&bound.sql, &bound.values)
            .await
            .map_err(|e| execution_error(id, e))?;

        if let Some(key) = statement.select_key() {
            if key.mode() == KeyMode::Post {
                generated_key = Some(self.select_key_value(conn, id, key, &params).await?);
            }
        }

        Ok(InsertOutcome {
            rows_affected,
            generated_key,
        })
    }

    /// Runs an update statement, returning the affected row count.
    pub async fn update<C>(&self, conn: &C, id: &str, params: &Params) -> Result<u64, Error>
    where
        C: Connection + ?Sized,
    {
        let statement = match self.statement(id)? {
            Statement::Update(s) => s,
            other => return Err(kind_error(id, "an update", other)),
        };
        let bound = statement
            .sql()
            .bind(conn.driver(), params, statement.parameters(), id)?;
        log::debug!("update `{id}`: {}", bound.sql);
        conn.execute(&bound.sql, &bound.values)
            .await
            .map_err(|e| execution_error(id, e))
    }

    /// Runs a delete statement, returning the affected row count.
    pub async fn delete<C>(&self, conn: &C, id: &str, params: &Params) -> Result<u64, Error>
    where
        C: Connection + ?Sized,
    {
        let statement = match self.statement(id)? {
            Statement::Delete(s) => s,
            other => return Err(kind_error(id, "a delete", other)),
        };
        let bound = statement
            .sql()
            .bind(conn.driver(), params, statement.parameters(), id)?;
        log::debug!("delete `{id}`: {}", bound.sql);
        conn.execute(&bound.sql, &bound.values)
            .await
            .map_err(|e| execution_error(id, e))
    }

    /// Runs a select statement and maps every row.
    ///
    /// A row that fails result-map coercion or object mapping fails the
    /// whole call; there are no partial result sets.
    pub async fn query_for_list<T, C>(
        &self,
        conn: &C,
        id: &str,
        params: &Params,
    ) -> Result<Vec<T>, Error>
    where
        T: FromRow,
        C: Connection + ?Sized,
    {
        let rows = self.query_rows(conn, id, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Like [`query_for_list`](Self::query_for_list), keeping only `max`
    /// rows starting at `skip`.
    pub async fn query_for_list_range<T, C>(
        &self,
        conn: &C,
        id: &str,
        params: &Params,
        skip: usize,
        max: Option<usize>,
    ) -> Result<Vec<T>, Error>
    where
        T: FromRow,
        C: Connection + ?Sized,
    {
        let rows = self.query_rows(conn, id, params).await?;
        rows.iter()
            .skip(skip)
            .take(max.unwrap_or(usize::MAX))
            .map(T::from_row)
            .collect()
    }

    /// Runs a select statement and maps the first row, if any.
    pub async fn query_for_object<T, C>(
        &self,
        conn: &C,
        id: &str,
        params: &Params,
    ) -> Result<Option<T>, Error>
    where
        T: FromRow,
        C: Connection + ?Sized,
    {
        let rows = self.query_rows(conn, id, params).await?;
        rows.first().map(T::from_row).transpose()
    }

    /// Runs a select statement and returns the first column of the first
    /// row, if any.
    pub async fn query_for_scalar<C>(
        &self,
        conn: &C,
        id: &str,
        params: &Params,
    ) -> Result<Option<Value>, Error>
    where
        C: Connection + ?Sized,
    {
        let rows = self.query_rows(conn, id, params).await?;
        Ok(rows.first().and_then(|row| row.value_at(0)).cloned())
    }

    async fn query_rows<C>(&self, conn: &C, id: &str, params: &Params) -> Result<Vec<Row>, Error>
    where
        C: Connection + ?Sized,
    {
        let statement = match self.statement(id)? {
            Statement::Select(s) => s,
            other => return Err(kind_error(id, "a select", other)),
        };
        let bound = statement
            .sql()
            .bind(conn.driver(), params, statement.parameters(), id)?;
        log::debug!("select `{id}`: {}", bound.sql);
        let rows = conn
            .query(&bound.sql, &bound.values)
            .await
            .map_err(|e| execution_error(id, e))?;
        self.map_rows(statement, rows)
    }

    fn map_rows(&self, statement: &SelectStatement, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        match statement.result_map() {
            Some(result_map) => rows.iter().map(|row| result_map.apply(row)).collect(),
            None => Ok(rows),
        }
    }

    async fn select_key_value<C>(
        &self,
        conn: &C,
        id: &str,
        key: &SelectKey,
        params: &Params,
    ) -> Result<Value, Error>
    where
        C: Connection + ?Sized,
    {
        let bound = key.sql().bind(conn.driver(), params, &[], id)?;
        log::debug!("select key for `{id}`: {}", bound.sql);
        let rows = conn
            .query(&bound.sql, &bound.values)
            .await
            .map_err(|e| execution_error(id, e))?;
        rows.first()
            .and_then(|row| row.value_at(0))
            .cloned()
            .ok_or_else(|| Error::Mapping(format!("select key for `{id}` returned no value")))
    }
}

fn execution_error(id: &str, source: Error) -> Error {
    Error::Execution {
        statement: id.to_string(),
        source: Box::new(source),
    }
}

fn kind_error(id: &str, expected: &str, got: &Statement) -> Error {
    Error::Configuration(format!(
        "statement `{id}` is a {} statement, not {expected}",
        got.kind_name()
    ))
}
