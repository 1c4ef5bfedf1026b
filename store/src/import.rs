//! Envelope import - loads newline-delimited wire records into `sync_records`.

use crate::db::StoredRecord;
use crate::error::Result;
use serde::Serialize;
use std::io::BufRead;
use synctab_engine::{CleartextPayload, Connection, Envelope, Error, GenericTable, Timestamp};
use tracing::{debug, warn};

/// Import settings.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Stamp records without a `modified` with `now`
    pub restamp_missing_modified: bool,
    /// Import time in milliseconds
    pub now: Timestamp,
}

impl ImportOptions {
    pub fn new(restamp_missing_modified: bool) -> Self {
        Self {
            restamp_missing_modified,
            now: now_millis(),
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Records stored under a new guid
    pub inserted: usize,
    /// Records that replaced an existing guid
    pub updated: usize,
    /// Blank lines are not counted
    pub skipped: usize,
}

/// Import wire records, one per line, in a single transaction.
pub fn import_envelopes<R: BufRead>(
    conn: &dyn Connection,
    table: &GenericTable<StoredRecord>,
    reader: R,
    options: ImportOptions,
) -> Result<ImportReport> {
    conn.execute_write("BEGIN", &[]).map_err(Error::from)?;

    match import_lines(conn, table, reader, options) {
        Ok(report) => {
            conn.execute_write("COMMIT", &[]).map_err(Error::from)?;
            Ok(report)
        }
        Err(err) => {
            if let Err(rollback) = conn.execute_write("ROLLBACK", &[]) {
                warn!("Rollback failed: {}", rollback);
            }
            Err(err)
        }
    }
}

fn import_lines<R: BufRead>(
    conn: &dyn Connection,
    table: &GenericTable<StoredRecord>,
    mut reader: R,
    options: ImportOptions,
) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(err) => {
                warn!("Skipping line {}: not UTF-8 ({})", line_no, err);
                report.skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut envelope = Envelope::parse(line);
        if !envelope.is_valid() {
            warn!(
                "Skipping line {}: invalid envelope ({})",
                line_no,
                envelope.parse_error().unwrap_or("missing id or payload")
            );
            report.skipped += 1;
            continue;
        }

        let cleartext = envelope.payload().map(CleartextPayload::parse);
        if !cleartext.as_ref().is_some_and(|p| p.is_valid()) {
            warn!("Skipping line {}: invalid payload", line_no);
            report.skipped += 1;
            continue;
        }

        if options.restamp_missing_modified && envelope.modified() == 0 {
            envelope = envelope.with_modified(options.now);
        }

        let Some(record) = StoredRecord::from_envelope(&envelope) else {
            report.skipped += 1;
            continue;
        };

        match table.insert(conn, Some(&record)) {
            Ok(_) => report.inserted += 1,
            // The insert id is per connection and can repeat across tables
            Err(Error::NoOpInsert) if conn.rows_modified() > 0 => report.inserted += 1,
            Err(Error::NoOpInsert) => {
                debug!("Record {} exists, updating", record.guid);
                table.update(conn, Some(&record))?;
                report.updated += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(report)
}

/// Current time in milliseconds since the epoch.
pub fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
