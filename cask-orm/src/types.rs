//! # Column Type Resolution
//!
//! Per-driver tables mapping native column type names to a normalized
//! primitive classification. The tables are static data, loaded with the
//! binary and never mutated; each driver keeps its own table because the
//! native type systems genuinely disagree (PostgreSQL files `numeric` under
//! `float`, Oracle keeps it `numeric`) and that divergence must survive.

use serde::{Deserialize, Serialize};

use crate::database::Drivers;

/// Backend-independent primitive classification of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizedType {
    Numeric,
    Integer,
    Boolean,
    Float,
    String,
}

/// An ordered type table: first bucket containing the native name wins.
pub type TypeMap = &'static [(NormalizedType, &'static [&'static str])];

static PGSQL_TYPES: TypeMap = &[
    (
        NormalizedType::Integer,
        &["bit", "bit varying", "real", "serial", "int", "integer"],
    ),
    (NormalizedType::Boolean, &["boolean"]),
    (
        NormalizedType::Float,
        &["bigint", "bigserial", "double precision", "money", "numeric"],
    ),
];

static ORACLE_TYPES: TypeMap = &[(NormalizedType::Numeric, &["numeric"])];

static MYSQL_TYPES: TypeMap = &[
    (
        NormalizedType::Integer,
        &["tinyint", "smallint", "mediumint", "int", "integer", "bigint"],
    ),
    (NormalizedType::Boolean, &["bool", "boolean"]),
    (
        NormalizedType::Float,
        &["float", "double", "real", "decimal", "numeric"],
    ),
];

static SQLITE_TYPES: TypeMap = &[
    (NormalizedType::Integer, &["int", "integer"]),
    (NormalizedType::Boolean, &["bool", "boolean"]),
    (
        NormalizedType::Float,
        &["real", "double", "float", "numeric", "decimal"],
    ),
];

impl Drivers {
    /// The driver's native-to-normalized type table.
    pub fn type_map(&self) -> TypeMap {
        match self {
            Drivers::Postgres => PGSQL_TYPES,
            Drivers::MySQL => MYSQL_TYPES,
            Drivers::SQLite => SQLITE_TYPES,
            Drivers::Oracle => ORACLE_TYPES,
        }
    }

    /// Resolves a native column type name to its normalized type.
    ///
    /// The lookup is case-insensitive and never fails: a native type absent
    /// from the driver's table resolves to `NormalizedType::String`.
    pub fn normalized_type(&self, native: &str) -> NormalizedType {
        let native = native.to_lowercase();
        for (normalized, natives) in self.type_map() {
            if natives.contains(&native.as_str()) {
                return *normalized;
            }
        }
        NormalizedType::String
    }
}
