//! SQLite binding of the engine's connection capability.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, OpenFlags};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use synctab_engine::{Connection, DbError, Row, RowId, Value};

/// A single SQLite connection.
///
/// Not `Sync`: the connection-scoped insert id and change count are only
/// meaningful when one statement runs at a time.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, rusqlite::Error> {
        let conn = rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Ok(Self {
            conn: rusqlite::Connection::open_in_memory()?,
        })
    }

    /// The underlying driver connection.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn execute_write(&self, sql: &str, args: &[Value]) -> Result<(), DbError> {
        let params: Vec<SqlValue> = args.iter().map(to_sql).collect();
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map(|_| ())
            .map_err(db_error)
    }

    fn execute_query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError> {
        let params: Vec<SqlValue> = args.iter().map(to_sql).collect();
        let mut stmt = self.conn.prepare(sql).map_err(db_error)?;
        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(db_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(db_error)? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(from_sql))
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn last_inserted_row_id(&self) -> RowId {
        self.conn.last_insert_rowid()
    }

    fn rows_modified(&self) -> usize {
        usize::try_from(self.conn.changes()).unwrap_or(usize::MAX)
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

fn db_error(err: rusqlite::Error) -> DbError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    };
    DbError::new(code, err.to_string())
}
