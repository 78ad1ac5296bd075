use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration as StdDuration, Instant};

use accounting_core::{AccountingRecord, IdentityResolver};
use accounting_db::Db;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::parser::{EXIT_EVENT, split_line};
use crate::record::build_record;
use crate::types::{IngestIssue, IngestStats, LineError, Result};

/// Run-wide settings threaded through every stage of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub resolver: IdentityResolver,
    /// Set to stop the run after the line currently being processed.
    pub cancel: Arc<AtomicBool>,
}

impl IngestOptions {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self {
            resolver,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Result of feeding one line through the record pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Record(AccountingRecord),
    /// Blank lines and events other than job exits.
    Ignored,
    Rejected(LineError),
}

pub fn process_line(line: &str, resolver: &IdentityResolver) -> LineOutcome {
    match split_line(line) {
        Ok(Some(parsed)) => match build_record(&parsed, resolver) {
            Ok(record) => LineOutcome::Record(record),
            Err(err) => LineOutcome::Rejected(err),
        },
        Ok(None) => LineOutcome::Ignored,
        Err(err) => LineOutcome::Rejected(err),
    }
}

/// Records and diagnostics gathered from one input.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub file_path: String,
    pub records: Vec<AccountingRecord>,
    pub issues: Vec<IngestIssue>,
    pub lines_read: u64,
    pub exit_events: u64,
    pub lines_rejected: u64,
    pub cancelled: bool,
    pub skipped: bool,
    pub parse_duration: StdDuration,
}

fn line_context(line: &str) -> (Option<String>, Option<String>) {
    let mut fields = line.split(';');
    let timestamp = fields.next().map(str::to_string);
    let jobid = fields.nth(1).map(str::to_string);
    (jobid, timestamp)
}

fn is_exit_line(line: &[u8]) -> bool {
    line.split(|byte| *byte == b';').nth(1) == Some(EXIT_EVENT.as_bytes())
}

impl ParsedFile {
    fn reject(&mut self, line: &str, exit_event: bool, err: LineError) {
        if exit_event {
            self.exit_events += 1;
        }
        self.lines_rejected += 1;
        let (jobid, timestamp) = line_context(line);
        warn!(
            file = %self.file_path,
            line = self.lines_read,
            jobid = jobid.as_deref().unwrap_or("-"),
            timestamp = timestamp.as_deref().unwrap_or("-"),
            "incomplete record: {}",
            err
        );
        self.issues.push(IngestIssue {
            file_path: self.file_path.clone(),
            line: Some(self.lines_read),
            jobid,
            timestamp,
            message: err.to_string(),
        });
    }
}

/// Parses every line of `reader`. Lines that are not valid UTF-8 are
/// rejected individually; an I/O error stops the input but keeps the records
/// built before it.
pub fn ingest_reader<R: BufRead>(
    mut reader: R,
    file_path: &str,
    options: &IngestOptions,
) -> ParsedFile {
    let start = Instant::now();
    let mut parsed = ParsedFile {
        file_path: file_path.to_string(),
        ..ParsedFile::default()
    };
    let mut buf = Vec::new();

    loop {
        if options.is_cancelled() {
            parsed.cancelled = true;
            break;
        }
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                parsed.lines_read += 1;
                let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                let line = match std::str::from_utf8(raw) {
                    Ok(line) => line,
                    Err(err) => {
                        let offset = err.valid_up_to();
                        parsed.reject(
                            &String::from_utf8_lossy(raw),
                            is_exit_line(raw),
                            LineError::InvalidEncoding { offset },
                        );
                        continue;
                    }
                };
                match process_line(line, &options.resolver) {
                    LineOutcome::Record(record) => {
                        parsed.exit_events += 1;
                        parsed.records.push(record);
                    }
                    LineOutcome::Ignored => {}
                    LineOutcome::Rejected(err) => {
                        parsed.reject(line, is_exit_line(raw), err);
                    }
                }
            }
            Err(err) => {
                warn!(file = file_path, "read failed: {}", err);
                parsed.issues.push(IngestIssue {
                    file_path: file_path.to_string(),
                    line: Some(parsed.lines_read + 1),
                    jobid: None,
                    timestamp: None,
                    message: err.to_string(),
                });
                break;
            }
        }
    }

    parsed.parse_duration = start.elapsed();
    parsed
}

fn parse_file(path: &Path, options: &IngestOptions) -> ParsedFile {
    let file_path = path.to_string_lossy().to_string();
    match File::open(path) {
        Ok(file) => ingest_reader(BufReader::new(file), &file_path, options),
        Err(err) => {
            warn!(file = %file_path, "cannot open log file: {}", err);
            ParsedFile {
                issues: vec![IngestIssue {
                    file_path: file_path.clone(),
                    line: None,
                    jobid: None,
                    timestamp: None,
                    message: err.to_string(),
                }],
                file_path,
                skipped: true,
                ..ParsedFile::default()
            }
        }
    }
}

/// Ingests accounting log files into the store.
///
/// Files are parsed in parallel; each file's records are then written in
/// input order inside a single transaction. Store failures abort the run.
pub fn ingest_files(
    db: &mut Db,
    paths: &[PathBuf],
    options: &IngestOptions,
) -> Result<IngestStats> {
    db.require_schema()?;
    let run_start = Instant::now();
    let mut stats = IngestStats {
        files_scanned: paths.len(),
        ..IngestStats::default()
    };

    let parsed_files = paths
        .par_iter()
        .map(|path| parse_file(path, options))
        .collect::<Vec<_>>();

    let mut parse_total = StdDuration::ZERO;
    for parsed in parsed_files {
        parse_total += parsed.parse_duration;
        stats.lines_read += parsed.lines_read;
        stats.exit_events += parsed.exit_events;
        stats.lines_rejected += parsed.lines_rejected;
        stats.cancelled |= parsed.cancelled;
        stats.issues.extend(parsed.issues);
        if parsed.skipped {
            stats.files_skipped += 1;
            continue;
        }
        let written = db.upsert_records(&parsed.records)?;
        stats.records_upserted += written;
        info!(
            file = %parsed.file_path,
            lines = parsed.lines_read,
            records = written,
            rejected = parsed.lines_rejected,
            "ingested log file"
        );
    }

    info!(
        files = stats.files_scanned,
        skipped = stats.files_skipped,
        records = stats.records_upserted,
        rejected = stats.lines_rejected,
        parse_ms = parse_total.as_millis() as u64,
        total_ms = run_start.elapsed().as_millis() as u64,
        "ingest finished"
    );
    Ok(stats)
}
