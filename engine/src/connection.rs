//! The database connection capability.
//!
//! Tables never open a database. They are handed something implementing
//! [`Connection`] and read its connection-scoped counters right after each
//! write, so a connection must only run one statement at a time.

use crate::{Row, RowId, Value};
use std::fmt;

/// An error reported by the underlying database, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    /// Driver-specific error code, if the driver reported one
    pub code: Option<i32>,
    /// Driver error message
    pub message: String,
}

impl DbError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DbError {}

/// A synchronous database connection.
///
/// `last_inserted_row_id` and `rows_modified` describe the most recent
/// write on this connection. Callers must serialize access: an interleaved
/// writer would make those counters describe the wrong statement.
pub trait Connection {
    /// Execute a statement that does not return rows.
    fn execute_write(&self, sql: &str, args: &[Value]) -> Result<(), DbError>;

    /// Execute a statement and buffer every row it returns.
    fn execute_query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError>;

    /// Row id of the most recent successful insert on this connection.
    fn last_inserted_row_id(&self) -> RowId;

    /// Number of rows changed by the most recent write statement.
    fn rows_modified(&self) -> usize;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute_write(&self, sql: &str, args: &[Value]) -> Result<(), DbError> {
        (**self).execute_write(sql, args)
    }

    fn execute_query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError> {
        (**self).execute_query(sql, args)
    }

    fn last_inserted_row_id(&self) -> RowId {
        (**self).last_inserted_row_id()
    }

    fn rows_modified(&self) -> usize {
        (**self).rows_modified()
    }
}
