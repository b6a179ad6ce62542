//! The logbook ingestion pipeline.
//!
//! Archives flow strictly scan → unzip → parse → clean → load. Each stage
//! absorbs the failures that belong to it: unrecognized or unreadable files
//! are moved to the error area, per-message parse failures are collected as
//! data, and only the surviving reports reach storage. One bad archive never
//! aborts the run.

mod classify;
mod clean;
mod parse;
mod scan;
mod unzip;

use std::path::Path;
use std::{fs, io};

use tracing::{info, warn};

use crate::config::Config;
use crate::model::{ArchiveEntry, LogbookReport, OperationCode, RawMessage};
use crate::storage::Storage;

pub use classify::classify;
pub use clean::{ReportViews, ReportWithXml, clean};
pub use parse::{ParsedBatch, parse_batch};
pub use scan::{MAX_ARCHIVES_PER_SCAN, scan};
pub use unzip::extract_messages;

/// Errors that can occur while scanning and unpacking archives.
///
/// Parse failures are not here: they are data (`model::ParseError`), not
/// faults.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unrecognized archive name: {0}")]
    InvalidFilename(String),

    #[error("archive {0} contains no messages")]
    EmptyArchive(String),

    #[error("FLUX archive {name} must contain exactly one member, found {found}")]
    UnexpectedMemberCount { name: String, found: usize },

    #[error("member {member} of {name} is not valid UTF-8")]
    NonUtf8Member { name: String, member: String },

    #[error("malformed business envelope in {name}: {reason}")]
    MalformedEnvelope { name: String, reason: String },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, IngestError>;

/// What one `ingest` invocation accomplished.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub archives_treated: usize,
    pub archives_errored: usize,
    pub reports_written: usize,
    pub raw_messages_written: usize,
    pub parse_errors: usize,
}

/// Runs the pipeline over one batch of received archives.
///
/// At most [`MAX_ARCHIVES_PER_SCAN`] archives are handled per call; callers
/// re-invoke until the received tree is drained. Successfully loaded
/// archives move to the treated root, failed ones to the error root.
pub fn run(config: &Config, storage: &mut Storage) -> Result<RunSummary> {
    let archives = scan(
        &config.received_dir,
        &config.treated_dir,
        &config.error_dir,
    )?;
    info!(count = archives.len(), "archives to ingest");

    let mut summary = RunSummary::default();
    for entry in archives {
        match ingest_archive(&entry, storage) {
            Ok(loaded) => {
                move_file(&entry.path(), &entry.treated_dir)?;
                summary.archives_treated += 1;
                summary.reports_written += loaded.reports;
                summary.raw_messages_written += loaded.raw_messages;
                summary.parse_errors += loaded.parse_errors;
            }
            Err(e) => {
                warn!(archive = %entry.file_name, error = %e, "archive failed, moving to error area");
                move_file(&entry.path(), &entry.error_dir)?;
                summary.archives_errored += 1;
            }
        }
    }

    info!(
        treated = summary.archives_treated,
        errored = summary.archives_errored,
        reports = summary.reports_written,
        "ingestion run complete"
    );
    Ok(summary)
}

struct LoadedArchive {
    reports: usize,
    raw_messages: usize,
    parse_errors: usize,
}

/// Unzip, parse, clean, and persist one archive.
fn ingest_archive(entry: &ArchiveEntry, storage: &mut Storage) -> Result<LoadedArchive> {
    let messages = extract_messages(entry)?;
    let batch = parse_batch(entry, messages);

    for err in &batch.errors {
        warn!(
            archive = %batch.entry.file_name,
            message_index = err.message_index,
            reason = %err.reason,
            "message failed to parse"
        );
    }

    let views = clean(Some(split_views(batch.reports, &batch.raw_messages)));
    let reports = flatten_views(views.unwrap_or_default());

    storage.store_reports(&batch.raw_messages, &reports)?;

    Ok(LoadedArchive {
        reports: reports.len(),
        raw_messages: batch.raw_messages.len(),
        parse_errors: batch.errors.len(),
    })
}

/// Splits parsed reports into the two views the cleaner filters.
///
/// Full declarations go to `parsed`; operations that only reference other
/// reports keep their originating XML alongside, so downstream consumers
/// can interpret them without a second lookup.
fn split_views(reports: Vec<LogbookReport>, raw_messages: &[RawMessage]) -> ReportViews {
    let mut parsed = Vec::new();
    let mut parsed_with_xml = Vec::new();

    for report in reports {
        match report.operation_code {
            OperationCode::Data | OperationCode::Correction => parsed.push(report),
            _ => {
                let xml = raw_messages
                    .iter()
                    .find(|m| m.operation_number == report.operation_number)
                    .map(|m| m.xml.clone())
                    .unwrap_or_default();
                parsed_with_xml.push(ReportWithXml { report, xml });
            }
        }
    }

    ReportViews {
        parsed: Some(parsed),
        parsed_with_xml: Some(parsed_with_xml),
    }
}

fn flatten_views(views: ReportViews) -> Vec<LogbookReport> {
    let mut reports = views.parsed.unwrap_or_default();
    reports.extend(
        views
            .parsed_with_xml
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.report),
    );
    reports
}

/// Moves a file into `dest_dir`, creating it as needed.
///
/// Overwrites on name collision. Falls back to copy-and-remove when the
/// source and destination sit on different filesystems.
pub(crate) fn move_file(src: &Path, dest_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dest_dir)?;
    let file_name = src
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dest = dest_dir.join(file_name);

    match fs::rename(src, &dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(src, &dest)?;
            fs::remove_file(src)
        }
    }
}
