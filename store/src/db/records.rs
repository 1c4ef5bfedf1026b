//! The `sync_records` table.
//!
//! One row per wire record, keyed by guid. Version history:
//! - 1: guid, collection, payload, modified
//! - 2: adds `sortindex`

use synctab_engine::{
    Connection, Envelope, FilterType, GenericTable, QueryOptions, QuerySort, Row, RowError, RowId,
    SchemaVersion, Statement, Timestamp, Value,
};
use tracing::error;

pub const TABLE_NAME: &str = "sync_records";
pub const TABLE_VERSION: SchemaVersion = 2;

const COLUMNS: &str = "id INTEGER PRIMARY KEY AUTOINCREMENT, \
                       guid TEXT NOT NULL UNIQUE, \
                       collection TEXT NOT NULL DEFAULT '', \
                       payload TEXT NOT NULL, \
                       sortindex INTEGER NOT NULL DEFAULT 0, \
                       modified INTEGER NOT NULL DEFAULT 0";

const SELECT: &str =
    "SELECT id, guid, collection, payload, sortindex, modified FROM sync_records";

/// A stored wire record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Row id, absent until the record has been read back from the table
    pub id: Option<RowId>,
    pub guid: String,
    pub collection: String,
    pub payload: String,
    pub sortindex: i64,
    /// Milliseconds since the epoch
    pub modified: Timestamp,
}

impl StoredRecord {
    /// Convert a wire record. Returns `None` for invalid envelopes.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        if !envelope.is_valid() {
            return None;
        }
        Some(Self {
            id: None,
            guid: envelope.id()?.to_string(),
            collection: envelope.collection().to_string(),
            payload: envelope.payload()?.to_string(),
            sortindex: envelope.sortindex(),
            modified: envelope.modified(),
        })
    }

    /// Convert back to a wire record for upload.
    pub fn to_envelope(&self) -> Envelope {
        Envelope::new(
            &self.guid,
            &self.collection,
            &self.payload,
            self.sortindex,
            self.modified,
        )
    }

    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            id: Some(row.get_named("id")?),
            guid: row.get_named("guid")?,
            collection: row.get_named("collection")?,
            payload: row.get_named("payload")?,
            sortindex: row.get_named("sortindex")?,
            modified: row.get_named("modified")?,
        })
    }
}

/// Build the `sync_records` table.
pub fn sync_records() -> GenericTable<StoredRecord> {
    GenericTable::new(TABLE_NAME, TABLE_VERSION, COLUMNS)
        .with_insert(|record: &StoredRecord| {
            Some(Statement::new(
                "INSERT OR IGNORE INTO sync_records (guid, collection, payload, sortindex, modified) \
                 VALUES (?, ?, ?, ?, ?)",
                vec![
                    record.guid.clone().into(),
                    record.collection.clone().into(),
                    record.payload.clone().into(),
                    record.sortindex.into(),
                    record.modified.into(),
                ],
            ))
        })
        .with_update(|record: &StoredRecord| {
            Some(Statement::new(
                "UPDATE sync_records SET collection = ?, payload = ?, sortindex = ?, modified = ? \
                 WHERE guid = ?",
                vec![
                    record.collection.clone().into(),
                    record.payload.clone().into(),
                    record.sortindex.into(),
                    record.modified.into(),
                    record.guid.clone().into(),
                ],
            ))
        })
        .with_delete(|record: Option<&StoredRecord>| {
            record.map(|record| {
                Statement::new(
                    "DELETE FROM sync_records WHERE guid = ?",
                    vec![record.guid.clone().into()],
                )
            })
        })
        .with_query(build_query)
        .with_factory(StoredRecord::from_row)
        .with_migration(migrate)
}

/// Supported options:
/// - no filter type: every record, or the records of one collection when
///   the filter is text
/// - `Guid` with a text filter, `Id` with an integer filter
/// - sort by row id (`None`) or newest first (`LastVisit`)
fn build_query(options: Option<&QueryOptions>) -> Option<Statement> {
    let Some(options) = options else {
        return Some(Statement::new(format!("{} ORDER BY id", SELECT), vec![]));
    };

    let (clause, args) = match (options.filter_type, &options.filter) {
        (FilterType::None, None) => ("", vec![]),
        (FilterType::None, Some(v @ Value::Text(_))) => (" WHERE collection = ?", vec![v.clone()]),
        (FilterType::Guid, Some(v @ Value::Text(_))) => (" WHERE guid = ?", vec![v.clone()]),
        (FilterType::Id, Some(v @ Value::Integer(_))) => (" WHERE id = ?", vec![v.clone()]),
        _ => return None,
    };
    let order = match options.sort {
        QuerySort::None => " ORDER BY id",
        QuerySort::LastVisit => " ORDER BY modified DESC, id",
        QuerySort::Frecency => return None,
    };
    Some(Statement::new(format!("{}{}{}", SELECT, clause, order), args))
}

fn migrate(conn: &dyn Connection, from: SchemaVersion) -> bool {
    match from {
        1 => match conn.execute_write(
            "ALTER TABLE sync_records ADD COLUMN sortindex INTEGER NOT NULL DEFAULT 0",
            &[],
        ) {
            Ok(()) => true,
            Err(err) => {
                error!("Error migrating {} from 1: {}", TABLE_NAME, err);
                false
            }
        },
        _ => false,
    }
}
