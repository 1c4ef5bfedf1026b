//! Error types for the synctab engine.

use crate::{DbError, SchemaVersion, TableName};
use thiserror::Error;

/// All possible errors from table operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Caller contract violations
    #[error("not insertable: no item or no insert statement for it")]
    NotInsertable,

    #[error("not updatable: no item or no update statement for it")]
    NotUpdatable,

    // Execution errors
    #[error("execution failed: {0}")]
    ExecutionFailed(#[from] DbError),

    #[error("insert did not produce a new row id")]
    NoOpInsert,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("could not decode row: {0}")]
    InvalidRow(#[from] RowError),

    // Schema errors
    #[error("schema drift on {table}: no migration from version {from} to {to}")]
    SchemaDriftUnresolved {
        table: TableName,
        from: SchemaVersion,
        to: SchemaVersion,
    },

    #[error("could not create table: {0}")]
    CreateFailed(TableName),
}

/// Errors raised while turning a raw row into a typed record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("no column named '{0}'")]
    MissingColumn(String),

    #[error("column index {0} out of range")]
    IndexOutOfRange(usize),

    #[error("type mismatch for column '{column}': expected {expected}, got {got}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid row: {0}")]
    Invalid(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
