//! SQLite-backed storage for synctab.
//!
//! Binds the engine's [`Connection`](synctab_engine::Connection) capability
//! to SQLite and provides the `sync_records` table plus an envelope importer.

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod sync_store;

pub use config::{Config, ConfigError};
pub use db::{sync_records, SqliteConnection, StoredRecord};
pub use error::{AppError, Result};
pub use import::{import_envelopes, now_millis, ImportOptions, ImportReport};
pub use sync_store::SyncStore;
