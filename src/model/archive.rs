//! Archive types: what was found on disk and what it contained.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The wire dialect a transmission was encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransmissionFormat {
    Ers3,
    Flux,
}

impl TransmissionFormat {
    /// The token persisted in the `transmission_format` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ers3 => "ERS3",
            Self::Flux => "FLUX",
        }
    }
}

impl fmt::Display for TransmissionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The filename prefix an archive was delivered under.
///
/// `UN` carries FLUX transmissions; `ERS3` and `ERS3_ACK` both carry ERS3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZippedFileKind {
    Un,
    Ers3,
    Ers3Ack,
}

/// One zip archive discovered in the received directory tree.
///
/// Immutable after creation. Identity is (file name, received dir).
/// The treated and error dirs mirror the file's partition subpath, so the
/// load stage can move the archive without re-deriving paths.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub file_name: String,
    pub received_dir: PathBuf,
    pub treated_dir: PathBuf,
    pub error_dir: PathBuf,
    pub transmission_format: TransmissionFormat,
}

impl ArchiveEntry {
    /// The archive's current location on disk.
    pub fn path(&self) -> PathBuf {
        self.received_dir.join(&self.file_name)
    }
}

/// The literal text of one XML document, kept for audit and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub operation_number: String,
    pub xml: String,
}

/// A failed message-to-report conversion.
///
/// Accumulated per archive batch; never raised as a fault. The batch always
/// completes with whatever subset parsed successfully plus this list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub archive: String,
    pub message_index: usize,
    pub reason: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message {} of {}: {}",
            self.message_index, self.archive, self.reason
        )
    }
}
