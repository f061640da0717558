//! # The SQL Map
//!
//! The process-wide collection of configured statements, keyed by id. Built
//! once by `SqlMapBuilder` at startup, validated while it is built, and
//! immutable afterwards, which makes concurrent reads safe without locking.

use std::collections::HashMap;

use crate::database::Drivers;
use crate::error::Error;
use crate::record::{self, KeyStrategy, Record};
use crate::statement::{
    DeleteStatement, InsertStatement, KeyMode, ParameterMapping, ResultMap, ResultMapping,
    SelectKey, SelectStatement, Statement, UpdateStatement,
};

/// The immutable statement map.
#[derive(Debug, Clone)]
pub struct SqlMap {
    driver: Drivers,
    statements: HashMap<String, Statement>,
}

impl SqlMap {
    pub fn builder(driver: Drivers) -> SqlMapBuilder {
        SqlMapBuilder::new(driver)
    }

    /// The driver the map's generated statements were rendered for.
    pub fn driver(&self) -> Drivers {
        self.driver
    }

    pub fn get(&self, id: &str) -> Option<&Statement> {
        self.statements.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.statements.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Builds a `SqlMap`, rejecting malformed configuration before anything can
/// execute.
///
/// # Example
///
/// ```rust,ignore
/// let map = SqlMap::builder(Drivers::SQLite)
///     .register_record::<Account>()?
///     .statement(SelectStatement::new(
///         "accounts.count",
///         "SELECT COUNT(*) FROM accounts",
///         vec![],
///     )?.into())?
///     .build();
/// ```
#[derive(Debug)]
pub struct SqlMapBuilder {
    driver: Drivers,
    statements: HashMap<String, Statement>,
}

impl SqlMapBuilder {
    pub fn new(driver: Drivers) -> Self {
        Self {
            driver,
            statements: HashMap::new(),
        }
    }

    /// Adds one statement. Ids must be unique within the map.
    pub fn statement(mut self, statement: Statement) -> Result<Self, Error> {
        let id = statement.id().to_string();
        if id.trim().is_empty() {
            return Err(Error::Configuration(
                "statement id must not be empty".to_string(),
            ));
        }
        if self.statements.contains_key(&id) {
            return Err(Error::Configuration(format!(
                "duplicate statement id `{id}`"
            )));
        }
        self.statements.insert(id, statement);
        Ok(self)
    }

    /// Generates and registers the statement family for a record type from
    /// its declared column metadata:
    ///
    /// - `{table}.insert` — with a select key matching the record's
    ///   [`KeyStrategy`] and the builder's driver
    /// - `{table}.update` / `{table}.delete` — keyed by primary key
    /// - `{table}.select_all` and one `{table}.select_by_{column}` per column
    ///
    /// Parameter and result mappings carry type hints resolved from each
    /// column's declared db type through the driver's type table.
    pub fn register_record<T: Record>(mut self) -> Result<Self, Error> {
        let table = record::table_key::<T>();
        let driver = self.driver;

        let columns: Vec<(String, &'static str, bool)> = T::columns()
            .into_iter()
            .map(|c| (record::column_key(c.name), c.db_type, c.primary_key))
            .collect();
        let pk = columns
            .iter()
            .find(|(_, _, primary_key)| *primary_key)
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(format!("record `{table}` declares no primary key"))
            })?;

        let strategy = T::key_strategy();
        let insert_columns: Vec<&(String, &'static str, bool)> = match strategy {
            // Identity keys exist only after the row does; the column stays
            // out of the insert list.
            KeyStrategy::Identity => columns.iter().filter(|(name, ..)| *name != pk.0).collect(),
            _ => columns.iter().collect(),
        };

        let hint = |db_type: &str| driver.normalized_type(db_type);
        let mapping = |(name, db_type, _): &(String, &'static str, bool)| {
            ParameterMapping::typed(name.clone(), hint(db_type))
        };
        let select_list = columns
            .iter()
            .map(|(name, ..)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let result_map = ResultMap::new(
            columns
                .iter()
                .map(|(name, db_type, _)| ResultMapping::new(name.clone()).typed(hint(db_type)))
                .collect(),
        );

        // insert
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            insert_columns
                .iter()
                .map(|(name, ..)| name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            insert_columns
                .iter()
                .map(|(name, ..)| format!("#{name}#"))
                .collect::<Vec<_>>()
                .join(", "),
        );
        let mut insert = InsertStatement::new(
            format!("{table}.insert"),
            &insert_sql,
            insert_columns.iter().map(|c| mapping(c)).collect(),
        )?;
        insert.set_select_key(generated_key(driver, &table, &pk.0, strategy)?);

        self = self.statement(insert.into())?;

        // update
        let assignments = columns
            .iter()
            .filter(|(name, ..)| *name != pk.0)
            .map(|(name, ..)| format!("{name} = #{name}#"))
            .collect::<Vec<_>>()
            .join(", ");
        let update_sql = format!(
            "UPDATE {} SET {} WHERE {} = #{}#",
            table, assignments, pk.0, pk.0
        );
        self = self.statement(
            UpdateStatement::new(
                format!("{table}.update"),
                &update_sql,
                columns.iter().map(|c| mapping(c)).collect(),
            )?
            .into(),
        )?;

        // delete
        let delete_sql = format!("DELETE FROM {} WHERE {} = #{}#", table, pk.0, pk.0);
        self = self.statement(
            DeleteStatement::new(
                format!("{table}.delete"),
                &delete_sql,
                vec![mapping(&pk)],
            )?
            .into(),
        )?;

        // selects
        let select_all_sql = format!("SELECT {} FROM {}", select_list, table);
        self = self.statement(
            SelectStatement::new(format!("{table}.select_all"), &select_all_sql, vec![])?
                .with_result_map(result_map.clone())
                .into(),
        )?;

        for column in &columns {
            let (name, ..) = column;
            let sql = format!(
                "SELECT {} FROM {} WHERE {} = #{}#",
                select_list, table, name, name
            );
            self = self.statement(
                SelectStatement::new(
                    format!("{table}.select_by_{name}"),
                    &sql,
                    vec![mapping(column)],
                )?
                .with_result_map(result_map.clone())
                .into(),
            )?;
        }

        Ok(self)
    }

    pub fn build(self) -> SqlMap {
        SqlMap {
            driver: self.driver,
            statements: self.statements,
        }
    }
}

/// The select key retrieving a generated primary key, per driver dialect.
///
/// Identity keys are read back after the insert; sequence keys are drawn
/// first and become part of the insert's parameters.
fn generated_key(
    driver: Drivers,
    table: &str,
    pk: &str,
    strategy: KeyStrategy,
) -> Result<Option<SelectKey>, Error> {
    match strategy {
        KeyStrategy::None => Ok(None),
        KeyStrategy::Identity => {
            let sql = match driver {
                Drivers::Postgres => "SELECT lastval()",
                Drivers::MySQL => "SELECT LAST_INSERT_ID()",
                Drivers::SQLite => "SELECT last_insert_rowid()",
                Drivers::Oracle => {
                    return Err(Error::Configuration(format!(
                        "record `{table}` asks for an identity key, which oracle does not \
                         provide; use a sequence"
                    )));
                }
            };
            Ok(Some(SelectKey::new(sql, pk, KeyMode::Post)?))
        }
        KeyStrategy::Sequence(sequence) => {
            let sql = match driver {
                Drivers::Postgres => format!("SELECT nextval('{sequence}')"),
                Drivers::Oracle => format!("SELECT {sequence}.NEXTVAL FROM DUAL"),
                Drivers::MySQL | Drivers::SQLite => {
                    return Err(Error::Configuration(format!(
                        "record `{table}` asks for sequence `{sequence}`, which {driver:?} \
                         does not provide; use an identity key"
                    )));
                }
            };
            Ok(Some(SelectKey::new(&sql, pk, KeyMode::Pre)?))
        }
    }
}
