//! # synctab Engine
//!
//! Typed table mapping and sync wire-record codecs for a browser-sync client.
//!
//! This crate holds the logic that sits between sync code and a relational
//! store. It never opens a database itself: the store is consumed through
//! the [`Connection`] capability, so the same tables run against SQLite in
//! production and against scripted fakes in tests.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine only talks to a [`Connection`] it is handed
//! - **No panics at the boundary**: every failure is a typed value
//! - **Immutable wire values**: envelopes and payloads are never mutated
//!
//! ## Core Concepts
//!
//! ### Tables
//!
//! A table is a named, versioned relation:
//! - [`SchemaTable`] - lifecycle: exists / create / drop / migrate
//! - [`GenericTable`] - typed insert / update / delete / query for one record type
//! - [`TableTable`] - the `tables` relation remembering persisted versions
//!
//! ### Queries
//!
//! Queries take [`QueryOptions`] and return a [`Cursor`], which is either a
//! sequence of typed rows or a failure naming the options that produced it.
//!
//! ### Wire records
//!
//! - [`Envelope`] - the outer sync record (id, collection, payload, sortindex, modified)
//! - [`CleartextPayload`] - the decrypted payload JSON (id, deleted)
//! - [`RecordPayload`] - specializations such as [`HistoryPayload`]
//!
//! ## Quick Start
//!
//! ```rust
//! use synctab_engine::{CleartextPayload, Envelope};
//!
//! let raw = r#"{"id":"abc","collection":"history","payload":"{\"id\":\"abc\"}","modified":1000.5}"#;
//! let envelope = Envelope::parse(raw);
//! assert!(envelope.is_valid());
//! assert_eq!(envelope.modified(), 1_000_500);
//!
//! let payload = CleartextPayload::parse(envelope.payload().unwrap());
//! assert!(payload.is_valid());
//! assert!(!payload.deleted());
//! ```

pub mod connection;
pub mod cursor;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod query;
pub mod schema;
pub mod table;
pub mod value;
pub mod versions;

// Re-export main types at crate root
pub use connection::{Connection, DbError};
pub use cursor::{Cursor, CursorStatus};
pub use envelope::Envelope;
pub use error::{Error, RowError};
pub use payload::{CleartextPayload, HistoryPayload, HistoryVisit, RecordPayload};
pub use query::{FilterType, QueryOptions, QuerySort};
pub use schema::{SchemaTable, TableInfo, TableStatus};
pub use table::{GenericTable, Statement};
pub use value::{FromValue, Row, Value};
pub use versions::{TableTable, VersionStore};

/// Type aliases for clarity
pub type RowId = i64;
pub type TableName = String;
pub type SchemaVersion = u32;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
