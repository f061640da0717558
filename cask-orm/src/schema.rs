//! # Table Schema Metadata
//!
//! Column and table descriptions produced by catalog introspection. A
//! `TableColumn` is complete at construction and immutable afterwards; its
//! normalized type is derived on demand through the owning driver's type
//! table.

use crate::database::Drivers;
use crate::types::NormalizedType;
use crate::value::Value;

/// Metadata for one column of an introspected table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    name: String,
    db_type: String,
    nullable: bool,
    default_value: Option<Value>,
    primary_key: bool,
    driver: Drivers,
}

impl TableColumn {
    /// All fields are supplied up front; there is no partially-described
    /// column.
    pub fn new(
        driver: Drivers,
        name: impl Into<String>,
        db_type: impl Into<String>,
        nullable: bool,
        default_value: Option<Value>,
        primary_key: bool,
    ) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            nullable,
            default_value,
            primary_key,
            driver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column type as the database reports it.
    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn primary_key(&self) -> bool {
        self.primary_key
    }

    /// The backend-independent classification of this column's native type.
    pub fn normalized_type(&self) -> NormalizedType {
        self.driver.normalized_type(&self.db_type)
    }
}

/// An introspected table: name plus its columns in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    name: String,
    columns: Vec<TableColumn>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<TableColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &TableColumn> {
        self.columns.iter().filter(|c| c.primary_key())
    }
}
