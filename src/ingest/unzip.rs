//! Message extractor: open a classified archive and yield its XML text.
//!
//! ERS3 archives batch several independent documents, one per member. FLUX
//! archives carry a single member, which may itself be a transport envelope
//! around the business document.

use std::fs;
use std::io::Read;

use zip::ZipArchive;

use crate::model::{ArchiveEntry, TransmissionFormat};

use super::parse::flux;
use super::{IngestError, Result};

/// Opens an archive and returns the raw text of each contained message.
///
/// A corrupt archive or an archive with zero extractable messages is an
/// extraction error; the caller routes the archive to the error area.
pub fn extract_messages(entry: &ArchiveEntry) -> Result<Vec<String>> {
    let file = fs::File::open(entry.path())?;
    let mut archive = ZipArchive::new(file)?;

    let messages = match entry.transmission_format {
        TransmissionFormat::Ers3 => extract_ers3(&mut archive, &entry.file_name)?,
        TransmissionFormat::Flux => extract_flux(&mut archive, &entry.file_name)?,
    };

    if messages.is_empty() {
        return Err(IngestError::EmptyArchive(entry.file_name.clone()));
    }
    Ok(messages)
}

/// Every top-level member is one independent XML message, in archive order.
fn extract_ers3(archive: &mut ZipArchive<fs::File>, name: &str) -> Result<Vec<String>> {
    let mut messages = Vec::new();
    for index in top_level_members(archive)? {
        messages.push(read_member_text(archive, index, name)?);
    }
    Ok(messages)
}

/// The single member is either the business document itself or a `BUSINESS`
/// envelope whose `Payload` element carries the document base64-encoded.
fn extract_flux(archive: &mut ZipArchive<fs::File>, name: &str) -> Result<Vec<String>> {
    let members = top_level_members(archive)?;
    let [index] = members[..] else {
        return Err(IngestError::UnexpectedMemberCount {
            name: name.to_string(),
            found: members.len(),
        });
    };

    let text = read_member_text(archive, index, name)?;
    match flux::unwrap_envelope(&text) {
        Ok(Some(unwrapped)) => Ok(vec![unwrapped]),
        Ok(None) => Ok(vec![text]),
        Err(reason) => Err(IngestError::MalformedEnvelope {
            name: name.to_string(),
            reason,
        }),
    }
}

/// Indices of regular members at the archive root, in archive order.
fn top_level_members(archive: &mut ZipArchive<fs::File>) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for index in 0..archive.len() {
        let member = archive.by_index(index)?;
        if !member.is_dir() && !member.name().contains('/') {
            indices.push(index);
        }
    }
    Ok(indices)
}

fn read_member_text(
    archive: &mut ZipArchive<fs::File>,
    index: usize,
    name: &str,
) -> Result<String> {
    let mut member = archive.by_index(index)?;
    let member_name = member.name().to_string();
    let mut bytes = Vec::new();
    member.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| IngestError::NonUtf8Member {
        name: name.to_string(),
        member: member_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use std::path::{Path, PathBuf};

    use base64::prelude::{BASE64_STANDARD, Engine as _};
    use tempfile::TempDir;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut archive = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, contents) in members {
            archive.start_file(*name, options).unwrap();
            archive.write_all(contents.as_bytes()).unwrap();
        }
        archive.finish().unwrap();
    }

    fn sample_entry(dir: &TempDir, file_name: &str, format: TransmissionFormat) -> ArchiveEntry {
        ArchiveEntry {
            file_name: file_name.to_string(),
            received_dir: dir.path().to_path_buf(),
            treated_dir: PathBuf::from("unused/treated"),
            error_dir: PathBuf::from("unused/error"),
            transmission_format: format,
        }
    }

    #[test]
    fn ers3_archive_yields_one_message_per_member_in_order() {
        let dir = TempDir::new().unwrap();
        write_zip(
            &dir.path().join("ERS3_JBE123456789012.zip"),
            &[
                ("first.xml", "This is an ERS3 message."),
                ("second.xml", "This is another ERS3 message."),
            ],
        );
        let entry = sample_entry(&dir, "ERS3_JBE123456789012.zip", TransmissionFormat::Ers3);

        let messages = extract_messages(&entry).unwrap();

        assert_eq!(
            messages,
            [
                "This is an ERS3 message.".to_string(),
                "This is another ERS3 message.".to_string(),
            ]
        );
    }

    #[test]
    fn flux_archive_with_direct_document_yields_it_verbatim() {
        let dir = TempDir::new().unwrap();
        let document = "<FLUXFAReportMessage>This is a UN message.</FLUXFAReportMessage>";
        write_zip(
            &dir.path().join("UN_JBE123456789012.zip"),
            &[("message.xml", document)],
        );
        let entry = sample_entry(&dir, "UN_JBE123456789012.zip", TransmissionFormat::Flux);

        let messages = extract_messages(&entry).unwrap();
        assert_eq!(messages, [document.to_string()]);
    }

    #[test]
    fn flux_archive_with_base64_envelope_yields_the_embedded_document() {
        let dir = TempDir::new().unwrap();
        let document = "<FLUXFAReportMessage>embedded</FLUXFAReportMessage>";
        let envelope = format!(
            "<BUSINESS><HEADER/><PostMsg><Payload>{}</Payload></PostMsg></BUSINESS>",
            BASE64_STANDARD.encode(document)
        );
        write_zip(
            &dir.path().join("UN_JBE123456789013.zip"),
            &[("message.xml", &envelope)],
        );
        let entry = sample_entry(&dir, "UN_JBE123456789013.zip", TransmissionFormat::Flux);

        let messages = extract_messages(&entry).unwrap();
        assert_eq!(messages, [document.to_string()]);
    }

    #[test]
    fn flux_archive_with_two_members_is_an_extraction_error() {
        let dir = TempDir::new().unwrap();
        write_zip(
            &dir.path().join("UN_JBE123456789014.zip"),
            &[("a.xml", "<a/>"), ("b.xml", "<b/>")],
        );
        let entry = sample_entry(&dir, "UN_JBE123456789014.zip", TransmissionFormat::Flux);

        let err = extract_messages(&entry).unwrap_err();
        assert!(matches!(
            err,
            IngestError::UnexpectedMemberCount { found: 2, .. }
        ));
    }

    #[test]
    fn empty_archive_is_an_extraction_error() {
        let dir = TempDir::new().unwrap();
        write_zip(&dir.path().join("ERS3_JBE123456789015.zip"), &[]);
        let entry = sample_entry(&dir, "ERS3_JBE123456789015.zip", TransmissionFormat::Ers3);

        let err = extract_messages(&entry).unwrap_err();
        assert!(matches!(err, IngestError::EmptyArchive(_)));
    }

    #[test]
    fn corrupt_container_is_an_extraction_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ERS3_JBE123456789016.zip"), "not a zip").unwrap();
        let entry = sample_entry(&dir, "ERS3_JBE123456789016.zip", TransmissionFormat::Ers3);

        let err = extract_messages(&entry).unwrap_err();
        assert!(matches!(err, IngestError::Zip(_)));
    }
}
