//! Filename classifier: map an archive's base name to its protocol taxonomy.

use crate::model::{TransmissionFormat, ZippedFileKind};

use super::{IngestError, Result};

/// Recognized prefixes, longest first so `ERS3_ACK` wins over `ERS3`.
const PREFIXES: [(&str, TransmissionFormat, ZippedFileKind); 3] = [
    ("ERS3_ACK_", TransmissionFormat::Ers3, ZippedFileKind::Ers3Ack),
    ("ERS3_", TransmissionFormat::Ers3, ZippedFileKind::Ers3),
    ("UN_", TransmissionFormat::Flux, ZippedFileKind::Un),
];

/// Classifies an archive's base name into (transmission format, file kind).
///
/// The name must be `{PREFIX}_{OPAQUE_ID}.zip` with PREFIX one of `UN`,
/// `ERS3`, `ERS3_ACK`. Pure and total: anything else is `InvalidFilename`.
pub fn classify(file_name: &str) -> Result<(TransmissionFormat, ZippedFileKind)> {
    let Some(stem) = file_name.strip_suffix(".zip") else {
        return Err(IngestError::InvalidFilename(file_name.to_string()));
    };

    for (prefix, format, kind) in PREFIXES {
        if let Some(id) = stem.strip_prefix(prefix)
            && !id.is_empty()
        {
            return Ok((format, kind));
        }
    }

    Err(IngestError::InvalidFilename(file_name.to_string()))
}
