//! # Records
//!
//! The active-record layer on top of the execution engine. A record type
//! declares its table, columns and key strategy once; registration turns
//! that metadata into the statement family the provided `save`/`delete`
//! methods and the [`Finder`] resolve by name at run time.

use std::marker::PhantomData;

use async_trait::async_trait;
use heck::ToSnakeCase;

use crate::database::Connection;
use crate::error::Error;
use crate::executor::SqlMapper;
use crate::row::FromRow;
use crate::value::{Params, Value};

/// Where a record stands relative to its database row.
///
/// Carried explicitly instead of inferred from an empty primary key, so a
/// legitimately zero key before the first save is not ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    /// Never saved; `save` inserts.
    #[default]
    New,
    /// Backed by a row; `save` updates.
    Persisted,
    /// The row was deleted; the in-memory values remain as a detached
    /// snapshot.
    Deleted,
}

/// Static metadata for one record column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordColumn {
    /// The column name in the database.
    pub name: &'static str,
    /// The declared SQL type, also used to derive bind-time type hints.
    pub db_type: &'static str,
    /// Whether this column is the primary key.
    pub primary_key: bool,
    /// Whether this column allows NULL values.
    pub nullable: bool,
}

/// How the primary key of a record is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// The caller supplies the key.
    #[default]
    None,
    /// The database assigns the key on insert; it is read back afterwards.
    Identity,
    /// The key is drawn from a named sequence before the insert.
    Sequence(&'static str),
}

pub(crate) fn table_key<T: Record>() -> String {
    normalize(T::table_name())
}

pub(crate) fn column_key(name: &str) -> String {
    normalize(name)
}

fn normalize(name: &str) -> String {
    name.strip_prefix("r#").unwrap_or(name).to_snake_case()
}

fn statement_id<T: Record>(operation: &str) -> String {
    format!("{}.{}", table_key::<T>(), operation)
}

/// A persistent record.
///
/// Implementors supply metadata and field conversions; `save` and `delete`
/// come for free and speak entirely through the execution engine, so every
/// engine failure reaches the caller unchanged.
///
/// # Example
///
/// ```rust,ignore
/// struct Account {
///     id: i64,
///     email: String,
///     state: RecordState,
/// }
///
/// impl Record for Account {
///     fn table_name() -> &'static str { "accounts" }
///     fn columns() -> Vec<RecordColumn> { /* ... */ }
///     // ...
/// }
///
/// let mut account = Account { id: 0, email: "ada@example.org".into(), state: RecordState::New };
/// account.save(&mapper, &db).await?;
/// assert_ne!(account.id, 0);
/// ```
#[async_trait]
pub trait Record: FromRow + Send + Sync {
    /// The table this record maps to.
    fn table_name() -> &'static str;

    /// Column metadata, primary key included.
    fn columns() -> Vec<RecordColumn>;

    /// How the primary key is generated. Defaults to caller-supplied.
    fn key_strategy() -> KeyStrategy {
        KeyStrategy::None
    }

    fn state(&self) -> RecordState;

    fn set_state(&mut self, state: RecordState);

    /// The record's fields as engine parameters, keyed by column name.
    fn to_params(&self) -> Params;

    /// Writes a database-generated key back into the record.
    fn apply_generated_key(&mut self, key: Value) -> Result<(), Error>;

    /// Inserts a new record or updates a persisted one.
    async fn save<C>(&mut self, mapper: &SqlMapper, conn: &C) -> Result<(), Error>
    where
        C: Connection + ?Sized,
    {
        match self.state() {
            RecordState::Deleted => Err(Error::RecordDeleted),
            RecordState::New => {
                let outcome = mapper
                    .insert(conn, &statement_id::<Self>("insert"), &self.to_params())
                    .await?;
                if let Some(key) = outcome.generated_key {
                    self.apply_generated_key(key)?;
                }
                self.set_state(RecordState::Persisted);
                Ok(())
            }
            RecordState::Persisted => {
                mapper
                    .update(conn, &statement_id::<Self>("update"), &self.to_params())
                    .await?;
                Ok(())
            }
        }
    }

    /// Deletes the record's row. The in-memory fields stay put, but the
    /// record no longer corresponds to anything stored.
    async fn delete<C>(&mut self, mapper: &SqlMapper, conn: &C) -> Result<u64, Error>
    where
        C: Connection + ?Sized,
    {
        if self.state() == RecordState::Deleted {
            return Err(Error::RecordDeleted);
        }
        let rows = mapper
            .delete(conn, &statement_id::<Self>("delete"), &self.to_params())
            .await?;
        self.set_state(RecordState::Deleted);
        Ok(rows)
    }
}

/// Looks records up by property through their registered select statements.
pub struct Finder<T: Record> {
    mapper: SqlMapper,
    marker: PhantomData<fn() -> T>,
}

impl<T: Record> Finder<T> {
    pub fn new(mapper: &SqlMapper) -> Self {
        Self {
            mapper: mapper.clone(),
            marker: PhantomData,
        }
    }

    /// Finds the record with the given primary key value.
    pub async fn find_by_key<C>(
        &self,
        conn: &C,
        key: impl Into<Value> + Send,
    ) -> Result<Option<T>, Error>
    where
        C: Connection + ?Sized,
    {
        let pk = T::columns()
            .into_iter()
            .find(|c| c.primary_key)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "record `{}` declares no primary key",
                    table_key::<T>()
                ))
            })?;
        self.find_by(conn, pk.name, key).await
    }

    /// Finds the first record whose property equals the given value.
    pub async fn find_by<C>(
        &self,
        conn: &C,
        property: &str,
        value: impl Into<Value> + Send,
    ) -> Result<Option<T>, Error>
    where
        C: Connection + ?Sized,
    {
        let property = column_key(property);
        let params = Params::new().with(property.clone(), value);
        let id = format!("{}.select_by_{}", table_key::<T>(), property);
        let mut found: Option<T> = self.mapper.query_for_object(conn, &id, &params).await?;
        if let Some(record) = found.as_mut() {
            record.set_state(RecordState::Persisted);
        }
        Ok(found)
    }

    /// Finds every record whose property equals the given value.
    pub async fn find_all_by<C>(
        &self,
        conn: &C,
        property: &str,
        value: impl Into<Value> + Send,
    ) -> Result<Vec<T>, Error>
    where
        C: Connection + ?Sized,
    {
        let property = column_key(property);
        let params = Params::new().with(property.clone(), value);
        let id = format!("{}.select_by_{}", table_key::<T>(), property);
        let mut found: Vec<T> = self.mapper.query_for_list(conn, &id, &params).await?;
        for record in &mut found {
            record.set_state(RecordState::Persisted);
        }
        Ok(found)
    }

    /// Returns every record of the table.
    pub async fn find_all<C>(&self, conn: &C) -> Result<Vec<T>, Error>
    where
        C: Connection + ?Sized,
    {
        let id = format!("{}.select_all", table_key::<T>());
        let mut found: Vec<T> = self
            .mapper
            .query_for_list(conn, &id, &Params::new())
            .await?;
        for record in &mut found {
            record.set_state(RecordState::Persisted);
        }
        Ok(found)
    }
}
