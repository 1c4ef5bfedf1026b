//! Persisted table versions.
//!
//! The `tables` relation records, for every table the app has created, the
//! schema version it was last brought to. [`SchemaTable::ensure`] compares
//! that against the version the code expects.

use crate::{
    Connection, Cursor, Error, FilterType, GenericTable, QueryOptions, Row, SchemaTable,
    SchemaVersion, Statement, TableInfo, Value,
};
use tracing::warn;

/// Lookup and record of a table's persisted version.
pub trait VersionStore {
    /// The persisted version of `name`, `None` if it was never recorded.
    ///
    /// A failed lookup is an error, not `None`.
    fn get_version(
        &self,
        conn: &dyn Connection,
        name: &str,
    ) -> Result<Option<SchemaVersion>, Error>;

    fn set_version(
        &self,
        conn: &dyn Connection,
        name: &str,
        version: SchemaVersion,
    ) -> Result<(), Error>;
}

/// The table of tables.
#[derive(Debug)]
pub struct TableTable {
    table: GenericTable<TableInfo>,
}

impl TableTable {
    pub const NAME: &'static str = "tables";
    pub const VERSION: SchemaVersion = 1;

    pub fn new() -> Self {
        let table = GenericTable::new(
            Self::NAME,
            Self::VERSION,
            "name TEXT PRIMARY KEY NOT NULL, version INTEGER NOT NULL",
        )
        .with_insert(|info: &TableInfo| {
            Some(Statement::new(
                "INSERT INTO tables (name, version) VALUES (?, ?)",
                vec![info.name.clone().into(), info.version.into()],
            ))
        })
        .with_update(|info: &TableInfo| {
            Some(Statement::new(
                "UPDATE tables SET version = ? WHERE name = ?",
                vec![info.version.into(), info.name.clone().into()],
            ))
        })
        .with_delete(|info: Option<&TableInfo>| {
            info.map(|info| {
                Statement::new(
                    "DELETE FROM tables WHERE name = ?",
                    vec![info.name.clone().into()],
                )
            })
        })
        .with_query(|options: Option<&QueryOptions>| {
            let options = match options {
                None => return Some(Statement::new("SELECT name, version FROM tables", vec![])),
                Some(options) => options,
            };
            match (&options.filter, options.filter_type) {
                (None, FilterType::None) => {
                    Some(Statement::new("SELECT name, version FROM tables", vec![]))
                }
                (Some(name @ Value::Text(_)), FilterType::None) => Some(Statement::new(
                    "SELECT name, version FROM tables WHERE name = ?",
                    vec![name.clone()],
                )),
                _ => None,
            }
        })
        .with_factory(|row: &Row| {
            Ok(TableInfo {
                name: row.get_named("name")?,
                version: row.get_named("version")?,
            })
        });
        Self { table }
    }

    /// Every recorded table and its version.
    pub fn all(&self, conn: &dyn Connection) -> Cursor<TableInfo> {
        self.table.query(conn, None)
    }

    /// Forget a table's version. Returns the number of entries removed.
    pub fn remove(&self, conn: &dyn Connection, name: &str) -> Result<usize, Error> {
        self.table.delete(conn, Some(&TableInfo::new(name, 0)))
    }
}

impl Default for TableTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaTable for TableTable {
    fn info(&self) -> &TableInfo {
        self.table.info()
    }

    fn columns(&self) -> &str {
        self.table.columns()
    }

    fn span(&self) -> &tracing::Span {
        self.table.span()
    }
}

impl VersionStore for TableTable {
    fn get_version(
        &self,
        conn: &dyn Connection,
        name: &str,
    ) -> Result<Option<SchemaVersion>, Error> {
        let _enter = self.table.span().enter();
        let found = self.table.try_exists(conn).and_then(|exists| {
            if !exists {
                return Ok(Vec::new());
            }
            let options = QueryOptions::filtered(name, FilterType::None);
            self.table.query(conn, Some(&options)).into_result()
        });
        match found {
            Ok(infos) => Ok(infos.into_iter().next().map(|info| info.version)),
            Err(err) => {
                warn!("Could not read version of {}: {}", name, err);
                Err(err)
            }
        }
    }

    fn set_version(
        &self,
        conn: &dyn Connection,
        name: &str,
        version: SchemaVersion,
    ) -> Result<(), Error> {
        if !self.table.create(conn) {
            return Err(Error::CreateFailed(Self::NAME.to_string()));
        }
        let info = TableInfo::new(name, version);
        if self.table.update(conn, Some(&info))? == 0 {
            self.table.insert(conn, Some(&info))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::{FakeConnection, WriteOutcome};
    use crate::{DbError, TableStatus};

    fn catalog_hit() -> Vec<Row> {
        vec![Row::from_pairs([("name", Value::from("tables"))])]
    }

    fn version_row(name: &str, version: i64) -> Row {
        Row::from_pairs([
            ("name", Value::from(name)),
            ("version", Value::Integer(version)),
        ])
    }

    #[test]
    fn missing_tables_relation_means_no_version() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(vec![]));

        assert_eq!(TableTable::new().get_version(&conn, "history"), Ok(None));
        assert_eq!(conn.read_count(), 1);
    }

    #[test]
    fn reads_recorded_version() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(catalog_hit()));
        conn.push_read(Ok(vec![version_row("history", 3)]));

        assert_eq!(TableTable::new().get_version(&conn, "history"), Ok(Some(3)));
        assert_eq!(conn.reads.borrow()[1].1, vec![Value::from("history")]);
    }

    #[test]
    fn unrecorded_table_has_no_version() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(catalog_hit()));
        conn.push_read(Ok(vec![]));

        assert_eq!(TableTable::new().get_version(&conn, "history"), Ok(None));
    }

    #[test]
    fn set_version_inserts_when_update_touches_nothing() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Changed(0)); // create
        conn.push_write(WriteOutcome::Changed(0)); // update
        conn.push_write(WriteOutcome::Inserted(1)); // insert

        TableTable::new().set_version(&conn, "history", 2).unwrap();
        let writes = conn.writes.borrow();
        assert_eq!(writes.len(), 3);
        assert!(writes[2].0.starts_with("INSERT INTO tables"));
        assert_eq!(writes[2].1, vec![Value::from("history"), Value::Integer(2)]);
    }

    #[test]
    fn set_version_updates_existing_entry() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Changed(0));
        conn.push_write(WriteOutcome::Changed(1));

        TableTable::new().set_version(&conn, "history", 2).unwrap();
        assert_eq!(conn.write_count(), 2);
    }

    #[test]
    fn set_version_surfaces_failures() {
        let conn = FakeConnection::new();
        conn.push_write(WriteOutcome::Fail(DbError::new(Some(8), "readonly database")));
        assert_eq!(
            TableTable::new().set_version(&conn, "history", 2),
            Err(Error::CreateFailed("tables".into()))
        );
    }

    #[test]
    fn ensure_creates_unrecorded_table() {
        let conn = FakeConnection::new();
        let versions = TableTable::new();
        let history: GenericTable<()> = GenericTable::new("history", 1, "guid TEXT");
        conn.push_read(Ok(vec![])); // `tables` not there yet
        conn.push_write(WriteOutcome::Changed(0)); // create history
        conn.push_write(WriteOutcome::Changed(0)); // create tables
        conn.push_write(WriteOutcome::Changed(0)); // update version
        conn.push_write(WriteOutcome::Inserted(1)); // insert version

        assert_eq!(history.ensure(&conn, &versions), Ok(TableStatus::Created));
        assert_eq!(
            conn.writes.borrow()[0].0,
            "CREATE TABLE IF NOT EXISTS history (guid TEXT)"
        );
    }

    #[test]
    fn ensure_reports_drift_without_migration() {
        let conn = FakeConnection::new();
        let versions = TableTable::new();
        let history: GenericTable<()> = GenericTable::new("history", 3, "guid TEXT");
        conn.push_read(Ok(catalog_hit()));
        conn.push_read(Ok(vec![version_row("history", 1)]));

        assert_eq!(
            history.ensure(&conn, &versions),
            Err(Error::SchemaDriftUnresolved {
                table: "history".into(),
                from: 1,
                to: 3,
            })
        );
        assert_eq!(conn.write_count(), 0);
    }

    #[test]
    fn ensure_leaves_current_table_alone() {
        let conn = FakeConnection::new();
        let versions = TableTable::new();
        let history: GenericTable<()> = GenericTable::new("history", 2, "guid TEXT");
        conn.push_read(Ok(catalog_hit()));
        conn.push_read(Ok(vec![version_row("history", 2)]));

        assert_eq!(history.ensure(&conn, &versions), Ok(TableStatus::Exists));
        assert_eq!(conn.write_count(), 0);
    }

    #[test]
    fn failed_version_read_is_an_error() {
        let conn = FakeConnection::new();
        conn.push_read(Ok(catalog_hit()));
        conn.push_read(Err(DbError::new(Some(5), "database is locked")));

        assert_eq!(
            TableTable::new().get_version(&conn, "history"),
            Err(Error::ExecutionFailed(DbError::new(
                Some(5),
                "database is locked"
            )))
        );
    }

    #[test]
    fn failed_catalog_lookup_is_an_error() {
        let conn = FakeConnection::new();
        conn.push_read(Err(DbError::new(Some(5), "database is locked")));

        assert!(TableTable::new().get_version(&conn, "history").is_err());
        assert_eq!(conn.read_count(), 1);
    }

    #[test]
    fn ensure_stops_when_version_cannot_be_read() {
        let conn = FakeConnection::new();
        let versions = TableTable::new();
        let history: GenericTable<()> = GenericTable::new("history", 2, "guid TEXT");
        conn.push_read(Ok(catalog_hit()));
        conn.push_read(Err(DbError::new(Some(5), "database is locked")));

        assert!(matches!(
            history.ensure(&conn, &versions),
            Err(Error::ExecutionFailed(_))
        ));
        // Neither created nor stamped with the current version
        assert_eq!(conn.write_count(), 0);
    }

    #[test]
    fn query_rejects_typed_filters() {
        let conn = FakeConnection::new();
        let options = QueryOptions::filtered("history", FilterType::Url);
        let cursor = TableTable::new().table.query(&conn, Some(&options));
        assert!(!cursor.is_success());
        assert_eq!(conn.read_count(), 0);
    }
}
