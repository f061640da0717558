//! # Cask ORM
//!
//! A statement-map and active-record data access layer built on top of sqlx.
//!
//! Statements (insert/update/delete/select) are declared up front — in code
//! or from a JSON document — validated while the [`SqlMap`] is built, and
//! executed by name through [`SqlMapper`] against any [`Connection`].
//! Inserts can carry a select key that retrieves a database-generated
//! primary key, drawn from a sequence before the insert or read back from
//! an identity column after it. The [`Record`] trait layers `save`, finders
//! and `delete` on top of the same engine.
//!
//! ```rust,ignore
//! let db = Database::connect("sqlite::memory:").await?;
//! let mapper = SqlMapper::new(
//!     SqlMap::builder(db.driver()).register_record::<Account>()?.build(),
//! );
//!
//! let mut account = Account::new("ada@example.org");
//! account.save(&mapper, &db).await?;
//!
//! let found = Finder::<Account>::new(&mapper)
//!     .find_by(&db, "email", "ada@example.org")
//!     .await?;
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod record;
pub mod row;
pub mod schema;
pub mod sqlmap;
pub mod statement;
pub mod transaction;
pub mod types;
pub mod value;

pub use config::SqlMapConfig;
pub use database::{Connection, Database, DatabaseBuilder, Drivers};
pub use error::Error;
pub use executor::{InsertOutcome, SqlMapper};
pub use record::{Finder, KeyStrategy, Record, RecordColumn, RecordState};
pub use row::{FromRow, FromValue, Row};
pub use schema::{TableColumn, TableInfo};
pub use sqlmap::{SqlMap, SqlMapBuilder};
pub use statement::{
    BoundSql, DeleteStatement, InsertStatement, KeyMode, ParameterMapping, ResultMap,
    ResultMapping, SelectKey, SelectStatement, SqlText, Statement, UpdateStatement,
};
pub use transaction::Transaction;
pub use types::NormalizedType;
pub use value::{Params, Value};
