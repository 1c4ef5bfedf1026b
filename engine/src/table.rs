//! Typed CRUD over a versioned table.
//!
//! A [`GenericTable`] is assembled from a schema descriptor and a set of
//! per-record-type functions: statement builders for insert, update,
//! delete and query, a row factory, and optionally a migration. Any of them
//! may be missing; the operation that needs a missing piece fails with a
//! typed error instead of touching the connection.

use crate::{
    Connection, Cursor, Error, QueryOptions, Row, RowError, RowId, SchemaTable, SchemaVersion,
    TableInfo, TableName, Value,
};
use std::fmt;
use tracing::{debug, error};

/// A SQL statement with positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

pub type ItemBuilder<T> = Box<dyn Fn(&T) -> Option<Statement> + Send + Sync>;
pub type DeleteBuilder<T> = Box<dyn Fn(Option<&T>) -> Option<Statement> + Send + Sync>;
pub type QueryBuilder = Box<dyn Fn(Option<&QueryOptions>) -> Option<Statement> + Send + Sync>;
pub type RowFactory<T> = Box<dyn Fn(&Row) -> Result<T, RowError> + Send + Sync>;
pub type Migration = Box<dyn Fn(&dyn Connection, SchemaVersion) -> bool + Send + Sync>;

/// A table mapping records of type `T` onto one relation.
pub struct GenericTable<T> {
    info: TableInfo,
    columns: String,
    insert_builder: Option<ItemBuilder<T>>,
    update_builder: Option<ItemBuilder<T>>,
    delete_builder: Option<DeleteBuilder<T>>,
    query_builder: Option<QueryBuilder>,
    factory: Option<RowFactory<T>>,
    migration: Option<Migration>,
    span: tracing::Span,
}

impl<T> GenericTable<T> {
    /// Create a table with no builders, no factory and no migration.
    pub fn new(
        name: impl Into<TableName>,
        version: SchemaVersion,
        columns: impl Into<String>,
    ) -> Self {
        let info = TableInfo::new(name, version);
        let span = tracing::debug_span!("table", name = %info.name);
        Self {
            info,
            columns: columns.into(),
            insert_builder: None,
            update_builder: None,
            delete_builder: None,
            query_builder: None,
            factory: None,
            migration: None,
            span,
        }
    }

    pub fn with_insert<F>(mut self, build: F) -> Self
    where
        F: Fn(&T) -> Option<Statement> + Send + Sync + 'static,
    {
        self.insert_builder = Some(Box::new(build));
        self
    }

    pub fn with_update<F>(mut self, build: F) -> Self
    where
        F: Fn(&T) -> Option<Statement> + Send + Sync + 'static,
    {
        self.update_builder = Some(Box::new(build));
        self
    }

    /// The delete builder also sees absent items and may choose to build
    /// a statement for them.
    pub fn with_delete<F>(mut self, build: F) -> Self
    where
        F: Fn(Option<&T>) -> Option<Statement> + Send + Sync + 'static,
    {
        self.delete_builder = Some(Box::new(build));
        self
    }

    /// A builder returning `None` rejects the options.
    pub fn with_query<F>(mut self, build: F) -> Self
    where
        F: Fn(Option<&QueryOptions>) -> Option<Statement> + Send + Sync + 'static,
    {
        self.query_builder = Some(Box::new(build));
        self
    }

    /// Without a factory the table is write-only and every query fails.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Row) -> Result<T, RowError> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Migration run by [`SchemaTable::update_table`].
    pub fn with_migration<F>(mut self, migrate: F) -> Self
    where
        F: Fn(&dyn Connection, SchemaVersion) -> bool + Send + Sync + 'static,
    {
        self.migration = Some(Box::new(migrate));
        self
    }

    /// Replace the logging span.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Insert an item and return the new row id.
    ///
    /// A statement that runs cleanly but leaves the last insert id where it
    /// was (for example `INSERT OR IGNORE` hitting a duplicate) yields
    /// [`Error::NoOpInsert`] rather than a stale id.
    pub fn insert(&self, conn: &dyn Connection, item: Option<&T>) -> Result<RowId, Error> {
        let _enter = self.span.enter();
        let statement = match (item, &self.insert_builder) {
            (Some(item), Some(build)) => build(item),
            _ => None,
        }
        .ok_or(Error::NotInsertable)?;

        let previous = conn.last_inserted_row_id();
        if let Err(err) = conn.execute_write(&statement.sql, &statement.args) {
            error!("Error inserting into {}: {}", self.info.name, err);
            return Err(err.into());
        }

        let now = conn.last_inserted_row_id();
        if now == previous {
            debug!("INSERT did not change last inserted row ID.");
            return Err(Error::NoOpInsert);
        }
        Ok(now)
    }

    /// Update an item and return the number of rows changed.
    pub fn update(&self, conn: &dyn Connection, item: Option<&T>) -> Result<usize, Error> {
        let _enter = self.span.enter();
        let statement = match (item, &self.update_builder) {
            (Some(item), Some(build)) => build(item),
            _ => None,
        }
        .ok_or(Error::NotUpdatable)?;

        if let Err(err) = conn.execute_write(&statement.sql, &statement.args) {
            error!("Error updating {}: {}", self.info.name, err);
            return Err(err.into());
        }
        Ok(conn.rows_modified())
    }

    /// Delete an item and return the number of rows removed.
    ///
    /// Nothing to delete is `Ok(0)`, not an error.
    pub fn delete(&self, conn: &dyn Connection, item: Option<&T>) -> Result<usize, Error> {
        let _enter = self.span.enter();
        let Some(statement) = self.delete_builder.as_ref().and_then(|build| build(item)) else {
            return Ok(0);
        };

        if let Err(err) = conn.execute_write(&statement.sql, &statement.args) {
            error!("Error deleting from {}: {}", self.info.name, err);
            return Err(err.into());
        }
        Ok(conn.rows_modified())
    }

    /// Run a query. Rejected options or a missing factory produce a failure
    /// cursor without executing anything.
    pub fn query(&self, conn: &dyn Connection, options: Option<&QueryOptions>) -> Cursor<T> {
        let _enter = self.span.enter();
        let statement = self.query_builder.as_ref().and_then(|build| build(options));
        let (Some(statement), Some(factory)) = (statement, self.factory.as_ref()) else {
            let filter = options.map_or_else(|| "none".to_string(), |o| o.describe_filter());
            return Cursor::failure(Error::InvalidQuery(filter), options.cloned());
        };

        match conn.execute_query(&statement.sql, &statement.args) {
            Ok(rows) => Cursor::from_rows(rows, factory, options),
            Err(err) => {
                error!("Error querying {}: {}", self.info.name, err);
                Cursor::failure(err.into(), options.cloned())
            }
        }
    }
}

impl<T> SchemaTable for GenericTable<T> {
    fn info(&self) -> &TableInfo {
        &self.info
    }

    fn columns(&self) -> &str {
        &self.columns
    }

    fn span(&self) -> &tracing::Span {
        &self.span
    }

    fn update_table(&self, conn: &dyn Connection, from: SchemaVersion) -> bool {
        let _enter = self.span.enter();
        debug!(
            "Update table {} from {} to {}",
            self.info.name, from, self.info.version
        );
        match &self.migration {
            Some(migrate) => migrate(conn, from),
            None => false,
        }
    }
}

impl<T> fmt::Debug for GenericTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericTable")
            .field("info", &self.info)
            .field("columns", &self.columns)
            .field("insertable", &self.insert_builder.is_some())
            .field("updatable", &self.update_builder.is_some())
            .field("deletable", &self.delete_builder.is_some())
            .field("queryable", &self.query_builder.is_some())
            .field("has_factory", &self.factory.is_some())
            .field("has_migration", &self.migration.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{FakeConnection, WriteOutcome};
    use crate::{CursorStatus, DbError, FilterType};

    #[derive(Debug, Clone, PartialEq)]
    struct Bookmark {
        guid: String,
        title: String,
    }

    fn bookmark(guid: &str) -> Bookmark {
        Bookmark {
            guid: guid.to_string(),
            title: format!("title {}", guid),
        }
    }

    fn bookmarks() -> GenericTable<Bookmark> {
        GenericTable::new("bookmarks", 1, "guid TEXT PRIMARY KEY, title TEXT")
            .with_insert(|b: &Bookmark| {
                Some(Statement::new(
                    "INSERT OR IGNORE INTO bookmarks (guid, title) VALUES (?, ?)",
                    vec![b.guid.clone().into(), b.title.clone().into()],
                ))
            })
            .with_update(|b: &Bookmark| {
                Some(Statement::new(
                    "UPDATE bookmarks SET title = ? WHERE guid = ?",
                    vec![b.title.clone().into(), b.guid.clone().into()],
                ))
            })
            .with_delete(|b: Option<&Bookmark>| {
                b.map(|b| {
                    Statement::new(
                        "DELETE FROM bookmarks WHERE guid = ?",
                        vec![b.guid.clone().into()],
                    )
                })
            })
            .with_query(|options: Option<&QueryOptions>| match options {
                None => Some(Statement::new("SELECT guid, title FROM bookmarks", vec![])),
                Some(o) if o.filter_type == FilterType::Guid => Some(Statement::new(
                    "SELECT guid, title FROM bookmarks WHERE guid = ?",
                    o.filter.clone().into_iter().collect(),
                )),
                Some(_) => None,
            })
            .with_factory(|row: &Row| {
                Ok(Bookmark {
                    guid: row.get_named("guid")?,
                    title: row.get_named("title")?,
                })
            })
    }

    fn bookmark_row(guid: &str, title: &str) -> Row {
        Row::from_pairs([("guid", Value::from(guid)), ("title", Value::from(title))])
    }

    #[test]
    fn insert_returns_new_row_id() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Inserted(1));
        let table = bookmarks();

        let id = table.insert(&conn, Some(&bookmark("a"))).unwrap();
        assert_eq!(id, 1);
        assert_eq!(conn.write_count(), 1);
        assert_eq!(conn.writes.borrow()[0].1[0], Value::from("a"));
    }

    #[test]
    fn insert_absent_item_is_not_insertable() {
        let conn = FakeConnection::new();
        let table = bookmarks();

        assert_eq!(table.insert(&conn, None), Err(Error::NotInsertable));
        assert_eq!(conn.write_count(), 0);
    }

    #[test]
    fn insert_without_statement_is_not_insertable() {
        let conn = FakeConnection::new();
        let table: GenericTable<Bookmark> =
            GenericTable::new("bookmarks", 1, "guid TEXT").with_insert(|_| None);

        assert_eq!(
            table.insert(&conn, Some(&bookmark("a"))),
            Err(Error::NotInsertable)
        );
        assert_eq!(conn.write_count(), 0);
    }

    #[test]
    fn insert_that_does_not_advance_row_id_is_a_no_op() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Inserted(1));
        conn.push_write(WriteOutcome::Changed(0));
        let table = bookmarks();

        assert_eq!(table.insert(&conn, Some(&bookmark("a"))), Ok(1));
        // The second statement ran but the row id stayed at 1
        assert_eq!(
            table.insert(&conn, Some(&bookmark("a"))),
            Err(Error::NoOpInsert)
        );
        assert_eq!(conn.write_count(), 2);
    }

    #[test]
    fn insert_propagates_execution_error_verbatim() {
        let conn = FakeConnection::new();
        let db_err = DbError::new(Some(19), "constraint failed");
        conn.push_write(WriteOutcome::Fail(db_err.clone()));

        assert_eq!(
            bookmarks().insert(&conn, Some(&bookmark("a"))),
            Err(Error::ExecutionFailed(db_err))
        );
    }

    #[test]
    fn update_reports_rows_modified() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Changed(1));
        conn.push_write(WriteOutcome::Changed(0));
        let table = bookmarks();

        assert_eq!(table.update(&conn, Some(&bookmark("a"))), Ok(1));
        // Zero rows without an error is distinguishable from a failure
        assert_eq!(table.update(&conn, Some(&bookmark("zzz"))), Ok(0));
    }

    #[test]
    fn update_failures() {
        let conn = FakeConnection::new();
        let table = bookmarks();
        assert_eq!(table.update(&conn, None), Err(Error::NotUpdatable));
        assert_eq!(conn.write_count(), 0);

        let db_err = DbError::new(Some(1), "no such table: bookmarks");
        conn.push_write(WriteOutcome::Fail(db_err.clone()));
        assert_eq!(
            table.update(&conn, Some(&bookmark("a"))),
            Err(Error::ExecutionFailed(db_err))
        );
    }

    #[test]
    fn delete_absent_item_is_silent_zero() {
        let conn = FakeConnection::new();
        let table = bookmarks();

        assert_eq!(table.delete(&conn, None), Ok(0));
        assert_eq!(conn.write_count(), 0);

        conn.push_write(WriteOutcome::Changed(1));
        assert_eq!(table.delete(&conn, Some(&bookmark("a"))), Ok(1));
    }

    #[test]
    fn delete_builder_sees_absent_items() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Changed(4));
        let table: GenericTable<Bookmark> = GenericTable::new("bookmarks", 1, "guid TEXT")
            .with_delete(|item| match item {
                Some(_) => None,
                None => Some(Statement::new("DELETE FROM bookmarks", vec![])),
            });

        assert_eq!(table.delete(&conn, None), Ok(4));
        assert_eq!(conn.writes.borrow()[0].0, "DELETE FROM bookmarks");
    }

    #[test]
    fn query_materializes_rows() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(vec![bookmark_row("a", "A"), bookmark_row("b", "B")]));

        let cursor = bookmarks().query(&conn, None);
        assert_eq!(cursor.status(), CursorStatus::Success);
        assert_eq!(cursor.row_count(), 2);
        let guids: Vec<_> = cursor.map(|b| b.guid).collect();
        assert_eq!(guids, vec!["a", "b"]);
    }

    #[test]
    fn query_passes_filter_as_argument() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(vec![bookmark_row("a", "A")]));
        let options = QueryOptions::filtered("a", FilterType::Guid);

        let items = bookmarks().query(&conn, Some(&options)).into_result().unwrap();
        assert_eq!(items, vec![Bookmark { guid: "a".into(), title: "A".into() }]);
        assert_eq!(conn.reads.borrow()[0].1, vec![Value::from("a")]);
    }

    #[test]
    fn rejected_options_never_execute() {
        let conn = FakeConnection::new();
        let options = QueryOptions::filtered("https://example.com", FilterType::Url);

        let cursor = bookmarks().query(&conn, Some(&options));
        assert_eq!(cursor.status(), CursorStatus::Failure);
        assert_eq!(
            cursor.message().unwrap(),
            "invalid query: \"https://example.com\""
        );
        assert_eq!(cursor.failure_details().unwrap().options, Some(options));
        assert_eq!(conn.read_count(), 0);
    }

    #[test]
    fn query_without_factory_fails() {
        let conn = FakeConnection::new();
        let table: GenericTable<Bookmark> = GenericTable::new("bookmarks", 1, "guid TEXT")
            .with_query(|_| Some(Statement::new("SELECT guid FROM bookmarks", vec![])));

        let cursor = table.query(&conn, None);
        assert_eq!(cursor.status(), CursorStatus::Failure);
        assert_eq!(cursor.message().unwrap(), "invalid query: none");
        assert_eq!(conn.read_count(), 0);
    }

    #[test]
    fn query_execution_error_becomes_failure_cursor() {
        let conn = FakeConnection::new();
        conn.push_read(Err(DbError::new(Some(1), "no such table: bookmarks")));

        let cursor = bookmarks().query(&conn, None);
        assert_eq!(
            cursor.into_result().unwrap_err(),
            Error::ExecutionFailed(DbError::new(Some(1), "no such table: bookmarks"))
        );
    }

    #[test]
    fn lifecycle_statements() {
        let conn = FakeConnection::new();
        let table = bookmarks();

        assert!(table.create(&conn));
        assert!(table.drop(&conn));
        let writes = conn.writes.borrow();
        assert_eq!(
            writes[0].0,
            "CREATE TABLE IF NOT EXISTS bookmarks (guid TEXT PRIMARY KEY, title TEXT)"
        );
        assert_eq!(writes[1].0, "DROP TABLE IF EXISTS bookmarks");
    }

    #[test]
    fn lifecycle_failures_return_false() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Fail(DbError::new(Some(1), "syntax error")));
        conn.push_write(WriteOutcome::Fail(DbError::new(Some(5), "database is locked")));
        conn.push_read(Err(DbError::new(Some(5), "database is locked")));
        let table = bookmarks();

        assert!(!table.create(&conn));
        assert!(!table.drop(&conn));
        assert!(!table.exists(&conn));
    }

    #[test]
    fn exists_checks_catalog_by_name() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(vec![Row::from_pairs([("name", Value::from("bookmarks"))])]));
        conn.push_read(Ok(vec![]));
        let table = bookmarks();

        assert!(table.exists(&conn));
        assert!(!table.exists(&conn));
        assert_eq!(conn.reads.borrow()[0].1, vec![Value::from("bookmarks")]);
    }

    #[test]
    fn update_table_without_migration_fails() {
        let conn = FakeConnection::new();
        assert!(!bookmarks().update_table(&conn, 0));
    }

    #[test]
    fn update_table_runs_migration() {
        let conn = FakeConnection::new();
        let table: GenericTable<Bookmark> = GenericTable::new("bookmarks", 2, "guid TEXT")
            .with_migration(|conn, from| {
                from == 1
                    && conn
                        .execute_write("ALTER TABLE bookmarks ADD COLUMN title TEXT", &[])
                        .is_ok()
            });

        assert!(table.update_table(&conn, 1));
        assert!(!table.update_table(&conn, 0));
        assert_eq!(conn.write_count(), 1);
    }
}
