//! The local sync store: one connection, its version table and `sync_records`.

use crate::config::Config;
use crate::db::{sync_records, SqliteConnection, StoredRecord};
use crate::error::Result;
use crate::import::{import_envelopes, ImportOptions, ImportReport};
use std::io::BufRead;
use synctab_engine::{Cursor, GenericTable, QueryOptions, SchemaTable, TableStatus, TableTable};
use tracing::info;

/// Local persistence for downloaded sync records.
#[derive(Debug)]
pub struct SyncStore {
    conn: SqliteConnection,
    versions: TableTable,
    records: GenericTable<StoredRecord>,
    restamp_missing_modified: bool,
}

impl SyncStore {
    /// Open the configured database and bring its tables up to date.
    pub fn open(config: &Config) -> Result<Self> {
        let conn = SqliteConnection::open(&config.database_path, config.busy_timeout)?;
        info!("Opened database at {}", config.database_path.display());
        Self::with_connection(conn, config.restamp_missing_modified)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(SqliteConnection::open_in_memory()?, true)
    }

    fn with_connection(conn: SqliteConnection, restamp_missing_modified: bool) -> Result<Self> {
        let store = Self {
            conn,
            versions: TableTable::new(),
            records: sync_records(),
            restamp_missing_modified,
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Create or migrate the records table.
    pub fn ensure_tables(&self) -> Result<TableStatus> {
        let status = self.records.ensure(&self.conn, &self.versions)?;
        info!("Table {} is {:?}", self.records.name(), status);
        Ok(status)
    }

    /// Import newline-delimited wire records.
    pub fn import<R: BufRead>(&self, reader: R) -> Result<ImportReport> {
        let options = ImportOptions::new(self.restamp_missing_modified);
        self.import_with(reader, options)
    }

    pub fn import_with<R: BufRead>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportReport> {
        let report = import_envelopes(&self.conn, &self.records, reader, options)?;
        info!(
            "Imported {} new, {} updated, {} skipped",
            report.inserted, report.updated, report.skipped
        );
        Ok(report)
    }

    /// Query stored records.
    pub fn records(&self, options: Option<&QueryOptions>) -> Cursor<StoredRecord> {
        self.records.query(&self.conn, options)
    }

    /// Delete a record by guid. Returns the number of rows removed.
    pub fn delete(&self, guid: &str) -> Result<usize> {
        let record = StoredRecord {
            id: None,
            guid: guid.to_string(),
            collection: String::new(),
            payload: String::new(),
            sortindex: 0,
            modified: 0,
        };
        Ok(self.records.delete(&self.conn, Some(&record))?)
    }

    pub fn connection(&self) -> &SqliteConnection {
        &self.conn
    }

    pub fn versions(&self) -> &TableTable {
        &self.versions
    }

    pub fn records_table(&self) -> &GenericTable<StoredRecord> {
        &self.records
    }
}
