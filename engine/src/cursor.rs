//! Typed query results.
//!
//! A [`Cursor`] either holds the rows a query produced or describes why the
//! query failed. It is consumed once: iterating drains it, and a fresh query
//! is needed to see the rows again.

use crate::{Error, QueryOptions, Row, RowError};
use std::vec;

/// Whether a cursor holds rows or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    Success,
    Failure,
}

/// Why a query produced no rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorFailure {
    /// The error that stopped the query
    pub error: Error,
    /// The options that produced the failure, for diagnosis
    pub options: Option<QueryOptions>,
}

/// The result of a query.
#[derive(Debug)]
pub struct Cursor<T> {
    rows: vec::IntoIter<T>,
    count: usize,
    failure: Option<CursorFailure>,
}

impl<T> Cursor<T> {
    /// A successful cursor over the given rows.
    pub fn success(rows: Vec<T>) -> Self {
        Self {
            count: rows.len(),
            rows: rows.into_iter(),
            failure: None,
        }
    }

    /// A failed cursor.
    pub fn failure(error: Error, options: Option<QueryOptions>) -> Self {
        Self {
            rows: Vec::new().into_iter(),
            count: 0,
            failure: Some(CursorFailure { error, options }),
        }
    }

    /// Turn raw rows into a cursor, failing as a whole if any row does not decode.
    pub fn from_rows<F>(rows: Vec<Row>, factory: F, options: Option<&QueryOptions>) -> Self
    where
        F: Fn(&Row) -> Result<T, RowError>,
    {
        match rows.iter().map(factory).collect::<Result<Vec<_>, _>>() {
            Ok(items) => Self::success(items),
            Err(err) => Self::failure(Error::InvalidRow(err), options.cloned()),
        }
    }

    pub fn status(&self) -> CursorStatus {
        if self.failure.is_some() {
            CursorStatus::Failure
        } else {
            CursorStatus::Success
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of rows the query produced, regardless of how many were consumed.
    pub fn row_count(&self) -> usize {
        self.count
    }

    /// Failure message, if the query failed.
    pub fn message(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.error.to_string())
    }

    pub fn failure_details(&self) -> Option<&CursorFailure> {
        self.failure.as_ref()
    }

    /// Collect the remaining rows, or return the failure.
    pub fn into_result(self) -> Result<Vec<T>, Error> {
        match self.failure {
            Some(failure) => Err(failure.error),
            None => Ok(self.rows.collect()),
        }
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
