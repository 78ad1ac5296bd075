mod fields;
mod parser;
mod pipeline;
mod record;
mod types;

pub use fields::{canonical_column, map_fields};
pub use parser::{EXIT_EVENT, LogLine, parse_attributes, split_line};
pub use pipeline::{
    IngestOptions, LineOutcome, ParsedFile, ingest_files, ingest_reader, process_line,
};
pub use record::{RecordBuilder, build_record, event_date};
pub use types::{IngestError, IngestIssue, IngestStats, LineError, Result};
