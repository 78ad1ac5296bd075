use accounting_core::UnitFormatError;
use serde::Serialize;

/// Why a single log line produced no record. Never fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("expected 4 ';'-separated fields, found {found}")]
    MalformedLine { found: usize },
    #[error("malformed attribute '{token}'")]
    MalformedAttribute { token: String },
    #[error("invalid value for '{field}': {source}")]
    UnitFormat {
        field: &'static str,
        #[source]
        source: UnitFormatError,
    },
    #[error("missing required attribute '{field}'")]
    MissingField { field: &'static str },
    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },
    #[error("line is not valid UTF-8 at byte {offset}")]
    InvalidEncoding { offset: usize },
}

/// Ingest summary returned after a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub lines_read: u64,
    pub exit_events: u64,
    pub lines_rejected: u64,
    pub records_upserted: usize,
    pub cancelled: bool,
    pub issues: Vec<IngestIssue>,
}

impl IngestStats {
    /// True when lines were rejected and nothing was stored.
    pub fn all_rejected(&self) -> bool {
        self.lines_rejected > 0 && self.records_upserted == 0
    }
}

/// Non-fatal issues encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestIssue {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub message: String,
}

/// Errors that abort the whole ingest run.
#[derive(Debug)]
pub enum IngestError {
    Store(accounting_db::DbError),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "accounting store error: {}", err),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<accounting_db::DbError> for IngestError {
    fn from(err: accounting_db::DbError) -> Self {
        Self::Store(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
