use rusqlite::OptionalExtension;

use crate::Db;
use crate::error::{DbError, Result};

pub const SCHEMA_SQL: &str = include_str!("../migrations/0001_accounting.sql");

impl Db {
    /// Creates the `accounting` table and its indexes when absent.
    pub fn ensure_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA_SQL)?;
        tx.commit()?;
        tracing::info!("accounting schema ready");
        Ok(())
    }

    pub fn has_schema(&self) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'accounting'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Fails with [`DbError::MissingSchema`] unless the table exists.
    pub fn require_schema(&self) -> Result<()> {
        if self.has_schema()? {
            Ok(())
        } else {
            Err(DbError::MissingSchema)
        }
    }
}
