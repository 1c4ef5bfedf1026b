//! Database module for SQLite persistence.

mod connection;
mod records;

pub use connection::*;
pub use records::*;
