use thiserror::Error;

/// Unified error type for all Cask operations.
///
/// Configuration problems (bad templates, duplicate statement ids) are
/// reported while the statement map is being built; everything else is
/// surfaced per execution and propagated to the caller unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// A statement definition or map is malformed. Raised at load time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An execution referenced a statement id the map does not contain.
    /// No SQL is issued for the call.
    #[error("statement `{0}` was not found in the sql map")]
    StatementNotFound(String),

    /// The caller's parameter set is missing a property referenced by the
    /// statement's SQL template. Detected before any SQL is sent.
    #[error("statement `{statement}` has no value for parameter `{property}`")]
    Binding { statement: String, property: String },

    /// The underlying database call failed. Carries the statement id and the
    /// original failure; never retried here.
    #[error("statement `{statement}` failed: {source}")]
    Execution {
        statement: String,
        #[source]
        source: Box<Error>,
    },

    /// A value could not be coerced into the declared target type.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// `save` was called on a record whose row was already deleted.
    #[error("record was deleted and no longer corresponds to a stored row")]
    RecordDeleted,

    /// Transport-level failure from the bundled sqlx backend.
    #[error("database driver error: {0}")]
    Driver(#[from] sqlx::Error),

    /// Transport-level failure from a custom `Connection` implementation.
    #[error("connection error: {0}")]
    Connection(String),
}
