mod error;
mod helpers;
mod records;
mod schema;
mod types;

use std::path::Path;

use rusqlite::Connection;

pub use error::{DbError, Result};
pub use schema::SCHEMA_SQL;
pub use types::{DailyUsage, RecordFilter};

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "cache_size", -20_000)?;
        tracing::debug!(path = %path.display(), "opened accounting store");
        Ok(Self { conn })
    }
}
