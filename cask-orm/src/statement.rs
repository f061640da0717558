//! # Statement Definitions
//!
//! Declarative Insert/Update/Delete/Select statements. Each definition owns
//! a parsed SQL template with `#name#` placeholders, an explicit parameter
//! binding list, and (per variant) a select-key or result map. Everything
//! here is validated while the statement map is built; execution never
//! discovers a malformed definition.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Deserialize;

use crate::database::Drivers;
use crate::error::Error;
use crate::types::NormalizedType;
use crate::value::{Params, Value};

// ============================================================================
// SQL Templates
// ============================================================================

/// An SQL template with named placeholders.
///
/// `#name#` marks a placeholder, `##` is a literal `#`. Parsing happens once
/// at configuration time; rendering substitutes driver-specific positional
/// parameters (`$n` for PostgreSQL, `:n` for Oracle, `?` otherwise) in
/// occurrence order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlText {
    raw: String,
    fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Text(String),
    Placeholder(String),
}

impl SqlText {
    pub fn parse(sql: &str) -> Result<Self, Error> {
        let mut fragments = Vec::new();
        let mut text = String::new();
        let mut rest = sql;

        while let Some(pos) = rest.find('#') {
            text.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            if let Some(stripped) = rest.strip_prefix('#') {
                text.push('#');
                rest = stripped;
                continue;
            }
            let end = rest.find('#').ok_or_else(|| {
                Error::Configuration(format!("unterminated placeholder in sql: {sql}"))
            })?;
            let name = &rest[..end];
            if name.is_empty() {
                return Err(Error::Configuration(format!(
                    "empty placeholder in sql: {sql}"
                )));
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::Configuration(format!(
                    "invalid placeholder name `{name}` in sql: {sql}"
                )));
            }
            if !text.is_empty() {
                fragments.push(Fragment::Text(std::mem::take(&mut text)));
            }
            fragments.push(Fragment::Placeholder(name.to_string()));
            rest = &rest[end + 1..];
        }
        text.push_str(rest);
        if !text.is_empty() {
            fragments.push(Fragment::Text(text));
        }

        Ok(Self {
            raw: sql.to_string(),
            fragments,
        })
    }

    /// The template as written, placeholders included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in occurrence order, duplicates included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Placeholder(name) => Some(name.as_str()),
            Fragment::Text(_) => None,
        })
    }

    /// Binds the caller's parameters into the template.
    ///
    /// Every placeholder must have a value in `params`; a missing one aborts
    /// the call before any SQL is sent. Values whose placeholder carries a
    /// type hint in `mappings` are coerced first.
    pub fn bind(
        &self,
        driver: Drivers,
        params: &Params,
        mappings: &[ParameterMapping],
        statement: &str,
    ) -> Result<BoundSql, Error> {
        let mut sql = String::with_capacity(self.raw.len());
        let mut values = Vec::new();

        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => sql.push_str(text),
                Fragment::Placeholder(name) => {
                    let value = params.get(name).cloned().ok_or_else(|| Error::Binding {
                        statement: statement.to_string(),
                        property: name.clone(),
                    })?;
                    let hint = mappings
                        .iter()
                        .find(|m| m.name == *name)
                        .and_then(|m| m.db_type);
                    let value = match hint {
                        Some(target) => value.coerce(target)?,
                        None => value,
                    };
                    values.push(value);
                    match driver {
                        Drivers::Postgres => {
                            let _ = write!(sql, "${}", values.len());
                        }
                        Drivers::Oracle => {
                            let _ = write!(sql, ":{}", values.len());
                        }
                        Drivers::MySQL | Drivers::SQLite => sql.push('?'),
                    }
                }
            }
        }

        Ok(BoundSql { sql, values })
    }
}

/// Driver-ready SQL plus its positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    pub sql: String,
    pub values: Vec<Value>,
}

// ============================================================================
// Parameter and Result Mappings
// ============================================================================

/// Binds one template placeholder, optionally with a type hint that drives
/// coercion at bind time.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMapping {
    pub name: String,
    pub db_type: Option<NormalizedType>,
}

impl ParameterMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, db_type: NormalizedType) -> Self {
        Self {
            name: name.into(),
            db_type: Some(db_type),
        }
    }
}

/// Renames and coerces one result column into a target property.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMapping {
    pub column: String,
    pub property: String,
    pub db_type: Option<NormalizedType>,
}

impl ResultMapping {
    pub fn new(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            property: column.clone(),
            column,
            db_type: None,
        }
    }

    pub fn to_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn typed(mut self, db_type: NormalizedType) -> Self {
        self.db_type = Some(db_type);
        self
    }
}

/// Ordered column-to-property mappings applied to every returned row of a
/// select statement. Columns the map does not mention are dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultMap {
    entries: Vec<ResultMapping>,
}

impl ResultMap {
    pub fn new(entries: Vec<ResultMapping>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ResultMapping] {
        &self.entries
    }

    pub fn apply(&self, row: &crate::row::Row) -> Result<crate::row::Row, Error> {
        let mut mapped = crate::row::Row::new();
        for entry in &self.entries {
            let value = row.get(&entry.column).cloned().ok_or_else(|| {
                Error::Mapping(format!(
                    "result map references column `{}` absent from the row",
                    entry.column
                ))
            })?;
            let value = match entry.db_type {
                Some(target) => value.coerce(target)?,
                None => value,
            };
            mapped.push(entry.property.clone(), value);
        }
        Ok(mapped)
    }
}

// ============================================================================
// Select Keys
// ============================================================================

/// When a select key runs relative to its parent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Before the insert; the retrieved key joins the insert's parameters.
    Pre,
    /// After the insert; the retrieved key is handed back to the caller.
    #[default]
    Post,
}

/// A sub-statement retrieving a database-generated key for its parent
/// insert. Owned by the insert; it has no life of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectKey {
    sql: SqlText,
    property: String,
    mode: KeyMode,
}

impl SelectKey {
    pub fn new(sql: &str, property: impl Into<String>, mode: KeyMode) -> Result<Self, Error> {
        Ok(Self {
            sql: SqlText::parse(sql)?,
            property: property.into(),
            mode,
        })
    }

    pub fn sql(&self) -> &SqlText {
        &self.sql
    }

    /// The property of the inserted object that receives the key.
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    id: String,
    sql: SqlText,
    parameters: Vec<ParameterMapping>,
    select_key: Option<SelectKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    id: String,
    sql: SqlText,
    parameters: Vec<ParameterMapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    id: String,
    sql: SqlText,
    parameters: Vec<ParameterMapping>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    id: String,
    sql: SqlText,
    parameters: Vec<ParameterMapping>,
    result_map: Option<ResultMap>,
}

fn validate_definition(
    id: &str,
    sql: &SqlText,
    parameters: &[ParameterMapping],
) -> Result<(), Error> {
    if id.trim().is_empty() {
        return Err(Error::Configuration(
            "statement id must not be empty".to_string(),
        ));
    }
    let placeholders: HashSet<&str> = sql.placeholders().collect();
    let mut seen = HashSet::new();
    for mapping in parameters {
        if !seen.insert(mapping.name.as_str()) {
            return Err(Error::Configuration(format!(
                "statement `{id}` maps parameter `{}` twice",
                mapping.name
            )));
        }
        if !placeholders.contains(mapping.name.as_str()) {
            return Err(Error::Configuration(format!(
                "statement `{id}` maps parameter `{}` which does not occur in its sql",
                mapping.name
            )));
        }
    }
    Ok(())
}

macro_rules! statement_accessors {
    ($t:ty) => {
        impl $t {
            pub fn id(&self) -> &str {
                &self.id
            }

            pub fn sql(&self) -> &SqlText {
                &self.sql
            }

            pub fn parameters(&self) -> &[ParameterMapping] {
                &self.parameters
            }
        }
    };
}

statement_accessors!(InsertStatement);
statement_accessors!(UpdateStatement);
statement_accessors!(DeleteStatement);
statement_accessors!(SelectStatement);

impl InsertStatement {
    pub fn new(
        id: impl Into<String>,
        sql: &str,
        parameters: Vec<ParameterMapping>,
    ) -> Result<Self, Error> {
        let id = id.into();
        let sql = SqlText::parse(sql)?;
        validate_definition(&id, &sql, &parameters)?;
        Ok(Self {
            id,
            sql,
            parameters,
            select_key: None,
        })
    }

    pub fn with_select_key(mut self, key: SelectKey) -> Self {
        self.select_key = Some(key);
        self
    }

    pub fn select_key(&self) -> Option<&SelectKey> {
        self.select_key.as_ref()
    }

    pub fn set_select_key(&mut self, key: Option<SelectKey>) {
        self.select_key = key;
    }
}

impl UpdateStatement {
    pub fn new(
        id: impl Into<String>,
        sql: &str,
        parameters: Vec<ParameterMapping>,
    ) -> Result<Self, Error> {
        let id = id.into();
        let sql = SqlText::parse(sql)?;
        validate_definition(&id, &sql, &parameters)?;
        Ok(Self { id, sql, parameters })
    }
}

impl DeleteStatement {
    pub fn new(
        id: impl Into<String>,
        sql: &str,
        parameters: Vec<ParameterMapping>,
    ) -> Result<Self, Error> {
        let id = id.into();
        let sql = SqlText::parse(sql)?;
        validate_definition(&id, &sql, &parameters)?;
        Ok(Self { id, sql, parameters })
    }
}

impl SelectStatement {
    pub fn new(
        id: impl Into<String>,
        sql: &str,
        parameters: Vec<ParameterMapping>,
    ) -> Result<Self, Error> {
        let id = id.into();
        let sql = SqlText::parse(sql)?;
        validate_definition(&id, &sql, &parameters)?;
        Ok(Self {
            id,
            sql,
            parameters,
            result_map: None,
        })
    }

    pub fn with_result_map(mut self, result_map: ResultMap) -> Self {
        self.result_map = Some(result_map);
        self
    }

    pub fn result_map(&self) -> Option<&ResultMap> {
        self.result_map.as_ref()
    }
}

/// A configured statement: the closed set of operations a sql map can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
}

impl Statement {
    pub fn id(&self) -> &str {
        match self {
            Statement::Insert(s) => s.id(),
            Statement::Update(s) => s.id(),
            Statement::Delete(s) => s.id(),
            Statement::Select(s) => s.id(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
            Statement::Select(_) => "select",
        }
    }
}

impl From<InsertStatement> for Statement {
    fn from(s: InsertStatement) -> Self {
        Statement::Insert(s)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(s: UpdateStatement) -> Self {
        Statement::Update(s)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(s: DeleteStatement) -> Self {
        Statement::Delete(s)
    }
}

impl From<SelectStatement> for Statement {
    fn from(s: SelectStatement) -> Self {
        Statement::Select(s)
    }
}
