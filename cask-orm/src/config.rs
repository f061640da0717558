//! # Declarative Statement Configuration
//!
//! Serde model of the statement document. Deserialization is the external
//! parsing step; every structural rule (unique ids, template syntax, mapping
//! coverage) is enforced while the document is turned into a [`SqlMap`], so
//! a malformed document never survives to execution time.
//!
//! ```json
//! {
//!   "statements": [
//!     {
//!       "kind": "insert",
//!       "id": "accounts.insert",
//!       "sql": "INSERT INTO accounts (id, email) VALUES (#id#, #email#)",
//!       "parameters": [{ "name": "id", "type": "integer" }],
//!       "selectKey": {
//!         "sql": "SELECT nextval('accounts_seq')",
//!         "property": "id",
//!         "mode": "pre"
//!       }
//!     }
//!   ]
//! }
//! ```

use serde::Deserialize;

use crate::database::Drivers;
use crate::error::Error;
use crate::sqlmap::SqlMap;
use crate::statement::{
    DeleteStatement, InsertStatement, KeyMode, ParameterMapping, ResultMap, ResultMapping,
    SelectKey, SelectStatement, UpdateStatement,
};
use crate::types::NormalizedType;

/// The root of a statement document.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlMapConfig {
    #[serde(default)]
    pub statements: Vec<StatementConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StatementConfig {
    Insert(InsertConfig),
    Update(DmlConfig),
    Delete(DmlConfig),
    Select(SelectConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertConfig {
    pub id: String,
    pub sql: String,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    #[serde(default, rename = "selectKey")]
    pub select_key: Option<SelectKeyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DmlConfig {
    pub id: String,
    pub sql: String,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectConfig {
    pub id: String,
    pub sql: String,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    #[serde(default, rename = "resultMap")]
    pub result_map: Option<Vec<ResultMappingConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    #[serde(default, rename = "type")]
    pub db_type: Option<NormalizedType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectKeyConfig {
    pub sql: String,
    /// The property of the inserted object that receives the key.
    pub property: String,
    #[serde(default)]
    pub mode: KeyMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultMappingConfig {
    pub column: String,
    /// Defaults to the column name.
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default, rename = "type")]
    pub db_type: Option<NormalizedType>,
}

impl SqlMapConfig {
    pub fn from_json(document: &str) -> Result<Self, Error> {
        serde_json::from_str(document)
            .map_err(|e| Error::Configuration(format!("invalid statement document: {e}")))
    }

    /// Builds the immutable statement map for the given driver.
    pub fn into_map(self, driver: Drivers) -> Result<SqlMap, Error> {
        let mut builder = SqlMap::builder(driver);
        for statement in self.statements {
            builder = match statement {
                StatementConfig::Insert(config) => {
                    let mut insert =
                        InsertStatement::new(config.id, &config.sql, mappings(config.parameters))?;
                    if let Some(key) = config.select_key {
                        insert.set_select_key(Some(SelectKey::new(
                            &key.sql,
                            key.property,
                            key.mode,
                        )?));
                    }
                    builder.statement(insert.into())?
                }
                StatementConfig::Update(config) => builder.statement(
                    UpdateStatement::new(config.id, &config.sql, mappings(config.parameters))?
                        .into(),
                )?,
                StatementConfig::Delete(config) => builder.statement(
                    DeleteStatement::new(config.id, &config.sql, mappings(config.parameters))?
                        .into(),
                )?,
                StatementConfig::Select(config) => {
                    let mut select =
                        SelectStatement::new(config.id, &config.sql, mappings(config.parameters))?;
                    if let Some(entries) = config.result_map {
                        select = select.with_result_map(ResultMap::new(
                            entries
                                .into_iter()
                                .map(|entry| ResultMapping {
                                    property: entry
                                        .property
                                        .unwrap_or_else(|| entry.column.clone()),
                                    column: entry.column,
                                    db_type: entry.db_type,
                                })
                                .collect(),
                        ));
                    }
                    builder.statement(select.into())?
                }
            };
        }
        Ok(builder.build())
    }
}

fn mappings(parameters: Vec<ParameterConfig>) -> Vec<ParameterMapping> {
    parameters
        .into_iter()
        .map(|p| ParameterMapping {
            name: p.name,
            db_type: p.db_type,
        })
        .collect()
}
