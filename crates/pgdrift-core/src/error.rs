//! Error types for the schema model

use thiserror::Error;

/// Violations of the structural invariants a well-formed table must satisfy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate table '{0}'")]
    DuplicateTable(String),

    #[error("duplicate column '{1}' in table '{0}'")]
    DuplicateColumn(String, String),

    #[error("table '{0}' has more than one PRIMARY KEY constraint")]
    MultiplePrimaryKeys(String),

    #[error("foreign key on table '{0}' references {1} columns but lists {2} local columns")]
    ForeignKeyArity(String, usize, usize),

    #[error("column '{1}' in table '{0}' combines GENERATED ... AS IDENTITY with DEFAULT")]
    IdentityWithDefault(String, String),
}

/// Result type alias for schema model operations
pub type Result<T> = std::result::Result<T, SchemaError>;
