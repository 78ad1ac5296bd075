/// Failures reaching or writing the accounting store. Always fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("accounting table is missing; create it with --create-table")]
    MissingSchema,
}

pub type Result<T> = std::result::Result<T, DbError>;
