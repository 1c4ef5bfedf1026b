//! Schema lifecycle for versioned tables.
//!
//! A [`SchemaTable`] knows its name, the version its code expects and its
//! column definition. From that it can check for, create, drop and migrate
//! its relation. [`SchemaTable::ensure`] ties these together with a
//! [`VersionStore`] so an app upgrade brings every table to its current
//! version.

use crate::{Connection, Error, SchemaVersion, TableName, Value, VersionStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Name and code-expected version of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: TableName,
    pub version: SchemaVersion,
}

impl TableInfo {
    pub fn new(name: impl Into<TableName>, version: SchemaVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// Outcome of bringing a table to its current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    /// The table was already at the current version
    Exists,
    /// The table was created
    Created,
    /// The table was migrated from an older version
    Updated,
}

/// Lifecycle of a named, versioned relation.
///
/// `exists`, `create` and `drop` never fail loudly: they log and return
/// `false`. A `false` from `update_table` means there is no automatic
/// migration path, which is schema drift rather than a transient error.
pub trait SchemaTable {
    fn info(&self) -> &TableInfo;

    /// Column definitions placed inside `CREATE TABLE name (...)`.
    fn columns(&self) -> &str;

    /// Span that lifecycle logging is recorded in.
    fn span(&self) -> &tracing::Span;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn version(&self) -> SchemaVersion {
        self.info().version
    }

    /// Whether the relation is registered in the catalog.
    fn exists(&self, conn: &dyn Connection) -> bool {
        match self.try_exists(conn) {
            Ok(exists) => exists,
            Err(err) => {
                let _enter = self.span().enter();
                error!("Error checking for {}: {}", self.name(), err);
                false
            }
        }
    }

    /// Catalog lookup that keeps "absent" and "could not look" apart.
    fn try_exists(&self, conn: &dyn Connection) -> Result<bool, Error> {
        let rows = conn.execute_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[Value::from(self.name())],
        )?;
        Ok(!rows.is_empty())
    }

    fn create(&self, conn: &dyn Connection) -> bool {
        let _enter = self.span().enter();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name(),
            self.columns()
        );
        if let Err(err) = conn.execute_write(&sql, &[]) {
            error!("Error creating {}: {}", self.name(), err);
            return false;
        }
        true
    }

    fn drop(&self, conn: &dyn Connection) -> bool {
        let _enter = self.span().enter();
        let sql = format!("DROP TABLE IF EXISTS {}", self.name());
        if let Err(err) = conn.execute_write(&sql, &[]) {
            error!("Error dropping {}: {}", self.name(), err);
            return false;
        }
        true
    }

    /// Migrate in place from `from` to the current version.
    ///
    /// Tables without a migration report failure.
    fn update_table(&self, _conn: &dyn Connection, from: SchemaVersion) -> bool {
        let _enter = self.span().enter();
        debug!(
            "Update table {} from {} to {}",
            self.name(),
            from,
            self.version()
        );
        false
    }

    /// Create or migrate the table so it matches the current version.
    ///
    /// A version lookup that fails is returned as is; nothing is created.
    fn ensure(
        &self,
        conn: &dyn Connection,
        versions: &dyn VersionStore,
    ) -> Result<TableStatus, Error> {
        let current = self.version();
        match versions.get_version(conn, self.name())? {
            None => {
                if !self.create(conn) {
                    return Err(Error::CreateFailed(self.name().to_string()));
                }
                versions.set_version(conn, self.name(), current)?;
                let _enter = self.span().enter();
                info!("Created {} at version {}", self.name(), current);
                Ok(TableStatus::Created)
            }
            Some(from) if from < current => {
                if !self.update_table(conn, from) {
                    return Err(Error::SchemaDriftUnresolved {
                        table: self.name().to_string(),
                        from,
                        to: current,
                    });
                }
                versions.set_version(conn, self.name(), current)?;
                let _enter = self.span().enter();
                info!("Updated {} from {} to {}", self.name(), from, current);
                Ok(TableStatus::Updated)
            }
            Some(_) => Ok(TableStatus::Exists),
        }
    }
}
