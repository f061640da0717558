//! # Database Module
//!
//! The connection boundary of the crate. `Connection` is the seam the
//! execution engine runs through: anything that can execute parameterized
//! SQL and hand rows back as `Value`s qualifies. `Database` is the bundled
//! implementation on top of an sqlx `AnyPool`, with driver detection,
//! schema introspection, and metadata-driven table creation for tests and
//! playgrounds.

// ============================================================================
// External Crate Imports
// ============================================================================

use futures::future::BoxFuture;
use heck::ToSnakeCase;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Arguments, Column, Row as _};
use std::collections::HashMap;
use std::sync::{Arc, Once, RwLock};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::error::Error;
use crate::record::{self, Record};
use crate::row::Row;
use crate::schema::{TableColumn, TableInfo};
use crate::value::Value;

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Supported database drivers.
///
/// Oracle participates in type resolution and SQL rendering but the bundled
/// sqlx backend cannot connect to it; reaching an Oracle server takes a
/// custom [`Connection`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver
    Postgres,
    /// MySQL driver
    MySQL,
    /// SQLite driver
    SQLite,
    /// Oracle driver (type resolution and rendering only)
    Oracle,
}

// ============================================================================
// Connection Trait
// ============================================================================

/// The connection abstraction the execution engine runs through.
///
/// One logical operation per call; transaction boundaries, pooling and
/// timeouts belong to the implementation behind this trait, not to the
/// engine.
pub trait Connection: Send + Sync {
    /// The driver dialect this connection speaks.
    fn driver(&self) -> Drivers;

    /// Runs a DML statement, returning the affected row count.
    fn execute<'a>(&'a self, sql: &'a str, params: &'a [Value])
    -> BoxFuture<'a, Result<u64, Error>>;

    /// Runs a query, returning all rows.
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, Error>>;
}

// ============================================================================
// Database Struct
// ============================================================================

/// The bundled sqlx-backed connection.
///
/// Wraps an `AnyPool` and is cheap to clone and share; introspected table
/// metadata is cached per table name for the life of the process.
#[derive(Debug, Clone)]
pub struct Database {
    /// The underlying SQLx connection pool
    pub(crate) pool: sqlx::AnyPool,
    /// The detected database driver
    pub(crate) driver: Drivers,
    /// Introspected schema metadata, immutable once filled in
    schema_cache: Arc<RwLock<HashMap<String, Arc<TableInfo>>>>,
}

// ============================================================================
// Database Implementation
// ============================================================================

impl Database {
    /// Creates a new DatabaseBuilder for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects to a database using the provided connection string.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        DatabaseBuilder::new().connect(url).await
    }

    /// Starts a new database transaction.
    pub async fn begin(&self) -> Result<crate::transaction::Transaction, Error> {
        let tx = self.pool.begin().await?;
        Ok(crate::transaction::Transaction::new(tx, self.driver))
    }

    /// Creates the table backing a record type from its declared metadata.
    pub async fn create_table<T: Record>(&self) -> Result<(), Error> {
        let table = record::table_key::<T>();
        let mut column_defs = Vec::new();

        for col in T::columns() {
            let mut def = format!("{} {}", record::column_key(col.name), col.db_type);
            if col.primary_key {
                def.push_str(" PRIMARY KEY");
            } else if !col.nullable {
                def.push_str(" NOT NULL");
            }
            column_defs.push(def);
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table,
            column_defs.join(", ")
        );
        log::debug!("create table: {sql}");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns the introspected metadata for a table, reading the database
    /// catalog on the first call and the process-wide cache afterwards.
    pub async fn describe_table(&self, table: &str) -> Result<Arc<TableInfo>, Error> {
        let key = table.to_snake_case();
        {
            let cache = self
                .schema_cache
                .read()
                .map_err(|_| Error::Connection("schema cache poisoned".to_string()))?;
            if let Some(info) = cache.get(&key) {
                return Ok(info.clone());
            }
        }

        let info = Arc::new(self.introspect_table(&key).await?);
        let mut cache = self
            .schema_cache
            .write()
            .map_err(|_| Error::Connection("schema cache poisoned".to_string()))?;
        Ok(cache.entry(key).or_insert(info).clone())
    }

    async fn introspect_table(&self, table: &str) -> Result<TableInfo, Error> {
        log::debug!("introspecting table `{table}` ({:?})", self.driver);
        let columns = match self.driver {
            Drivers::SQLite => self.introspect_sqlite(table).await?,
            Drivers::Postgres => self.introspect_postgres(table).await?,
            Drivers::MySQL => self.introspect_mysql(table).await?,
            Drivers::Oracle => {
                return Err(Error::Configuration(
                    "the bundled sqlx backend cannot introspect oracle tables".to_string(),
                ));
            }
        };
        if columns.is_empty() {
            return Err(Error::Configuration(format!(
                "table `{table}` does not exist or has no columns"
            )));
        }
        Ok(TableInfo::new(table, columns))
    }

    async fn introspect_sqlite(&self, table: &str) -> Result<Vec<TableColumn>, Error> {
        let sql = format!("PRAGMA table_info({table})");
        let rows = self.query(&sql, &[]).await?;
        let mut columns = Vec::new();
        for row in rows {
            let name = require_text(&row, "name")?;
            let db_type = require_text(&row, "type")?;
            let not_null = row.get("notnull").and_then(Value::as_i64).unwrap_or(0) != 0;
            let primary_key = row.get("pk").and_then(Value::as_i64).unwrap_or(0) > 0;
            let default_value = row.get("dflt_value").filter(|v| !v.is_null()).cloned();
            columns.push(TableColumn::new(
                self.driver,
                name,
                db_type,
                !not_null,
                default_value,
                primary_key,
            ));
        }
        Ok(columns)
    }

    async fn introspect_postgres(&self, table: &str) -> Result<Vec<TableColumn>, Error> {
        let sql = "SELECT c.column_name::TEXT AS name, c.data_type::TEXT AS type, \
                   c.is_nullable::TEXT AS nullable, c.column_default::TEXT AS dflt, \
                   EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON tc.constraint_name = kcu.constraint_name \
                      AND tc.table_schema = kcu.table_schema \
                    WHERE tc.table_name = c.table_name \
                      AND tc.constraint_type = 'PRIMARY KEY' \
                      AND kcu.column_name = c.column_name) AS pk \
                   FROM information_schema.columns c \
                   WHERE c.table_name = $1 AND c.table_schema = 'public' \
                   ORDER BY c.ordinal_position";
        let rows = self.query(sql, &[Value::Text(table.to_string())]).await?;
        let mut columns = Vec::new();
        for row in rows {
            let name = require_text(&row, "name")?;
            let db_type = require_text(&row, "type")?;
            let nullable = row
                .get("nullable")
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case("yes"));
            let primary_key = row.get("pk").and_then(Value::as_bool).unwrap_or(false);
            let default_value = row.get("dflt").filter(|v| !v.is_null()).cloned();
            columns.push(TableColumn::new(
                self.driver,
                name,
                db_type,
                nullable,
                default_value,
                primary_key,
            ));
        }
        Ok(columns)
    }

    async fn introspect_mysql(&self, table: &str) -> Result<Vec<TableColumn>, Error> {
        let sql = "SELECT COLUMN_NAME AS name, DATA_TYPE AS type, IS_NULLABLE AS nullable, \
                   COLUMN_DEFAULT AS dflt, COLUMN_KEY AS col_key \
                   FROM information_schema.columns \
                   WHERE table_name = ? AND table_schema = DATABASE() \
                   ORDER BY ORDINAL_POSITION";
        let rows = self.query(sql, &[Value::Text(table.to_string())]).await?;
        let mut columns = Vec::new();
        for row in rows {
            let name = require_text(&row, "name")?;
            let db_type = require_text(&row, "type")?;
            let nullable = row
                .get("nullable")
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case("yes"));
            let primary_key = row
                .get("col_key")
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case("pri"));
            let default_value = row.get("dflt").filter(|v| !v.is_null()).cloned();
            columns.push(TableColumn::new(
                self.driver,
                name,
                db_type,
                nullable,
                default_value,
                primary_key,
            ));
        }
        Ok(columns)
    }
}

fn require_text(row: &Row, column: &str) -> Result<String, Error> {
    row.get(column)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Mapping(format!("catalog row is missing column `{column}`")))
}

impl Connection for Database {
    fn driver(&self) -> Drivers {
        self.driver
    }

    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<u64, Error>> {
        Box::pin(async move {
            let args = any_arguments(params);
            let result = sqlx::query_with(sql, args).execute(&self.pool).await?;
            Ok(result.rows_affected())
        })
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<Vec<Row>, Error>> {
        Box::pin(async move {
            let args = any_arguments(params);
            let rows = sqlx::query_with(sql, args).fetch_all(&self.pool).await?;
            rows.iter().map(decode_any_row).collect()
        })
    }
}

// ============================================================================
// Value Encoding / Decoding
// ============================================================================

/// Encodes engine values as `any`-driver arguments. Uuids and datetimes go
/// over the wire as text; the `any` driver has no kinds for them.
pub(crate) fn any_arguments(params: &[Value]) -> AnyArguments<'static> {
    let mut args = AnyArguments::default();
    for value in params {
        let _ = match value {
            Value::Null => args.add(Option::<String>::None),
            Value::Bool(b) => args.add(*b),
            Value::Int(i) => args.add(*i),
            Value::Float(f) => args.add(*f),
            Value::Text(s) => args.add(s.clone()),
            Value::Uuid(u) => args.add(u.to_string()),
            Value::DateTime(dt) => args.add(dt.to_rfc3339()),
        };
    }
    args
}

pub(crate) fn decode_any_row(row: &AnyRow) -> Result<Row, Error> {
    let mut decoded = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            v.map(Value::Int).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            v.map(Value::Float).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            v.map(Value::Bool).unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            v.map(Value::Text).unwrap_or(Value::Null)
        } else {
            return Err(Error::Mapping(format!(
                "column `{}` has a type the any driver cannot decode",
                column.name()
            )));
        };
        decoded.push(column.name().to_string(), value);
    }
    Ok(decoded)
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

static INSTALL_DRIVERS: Once = Once::new();

pub struct DatabaseBuilder {
    max_connections: u32,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5 }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub async fn connect(self, url: &str) -> Result<Database, Error> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let driver = if url.starts_with("postgres") {
            Drivers::Postgres
        } else if url.starts_with("mysql") {
            Drivers::MySQL
        } else if url.starts_with("oracle") {
            return Err(Error::Configuration(
                "the bundled sqlx backend cannot connect to oracle; supply a custom Connection"
                    .to_string(),
            ));
        } else {
            Drivers::SQLite
        };

        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(url)
            .await?;
        log::debug!("connected ({driver:?})");

        Ok(Database {
            pool,
            driver,
            schema_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}
