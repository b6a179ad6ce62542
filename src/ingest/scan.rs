//! Archive extractor: walk the received tree and classify what it holds.
//!
//! The directory layout under the received root encodes a date partition,
//! but the walk treats it as opaque: the partition subpath is only mirrored
//! onto the treated and error roots so moves land in the matching place.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

use crate::model::ArchiveEntry;

use super::{Result, classify, move_file};

/// Ceiling on entries returned per invocation.
///
/// Bounds per-run memory and downstream batch size. Remaining conforming
/// files are left untouched for a subsequent invocation: deferred, never
/// lost.
pub const MAX_ARCHIVES_PER_SCAN: usize = 200;

/// Walks the received root and returns the conforming archives found.
///
/// Non-conforming files (unrecognized names, files that are not zip
/// containers) are moved to the error root under their partition subpath.
/// Conforming files stay in place: they move to treated or error only after
/// the load stage has decided their fate.
pub fn scan(received_root: &Path, treated_root: &Path, error_root: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();

    let walker = WalkBuilder::new(received_root)
        .standard_filters(false) // A spool directory: no gitignore semantics.
        .sort_by_file_name(Ord::cmp)
        .build();

    for item in walker.flatten() {
        if entries.len() == MAX_ARCHIVES_PER_SCAN {
            break;
        }
        if !item.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = item.path();
        let file_name = item.file_name().to_string_lossy().into_owned();
        let partition = partition_subpath(path, received_root);
        let error_dir = error_root.join(&partition);

        match classify(&file_name) {
            Ok((transmission_format, _)) if is_zip_container(path) => {
                entries.push(ArchiveEntry {
                    file_name,
                    received_dir: path.parent().unwrap_or(received_root).to_path_buf(),
                    treated_dir: treated_root.join(&partition),
                    error_dir,
                    transmission_format,
                });
            }
            Ok(_) => {
                warn!(file = %file_name, "not a zip container, moving to error area");
                move_file(path, &error_dir)?;
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "moving to error area");
                move_file(path, &error_dir)?;
            }
        }
    }

    Ok(entries)
}

/// The file's parent directory relative to the walked root.
fn partition_subpath(path: &Path, root: &Path) -> PathBuf {
    path.parent()
        .and_then(|p| p.strip_prefix(root).ok())
        .map_or_else(PathBuf::new, Path::to_path_buf)
}

/// True when the file opens as a zip archive.
fn is_zip_container(path: &Path) -> bool {
    match fs::File::open(path) {
        Ok(file) => zip::ZipArchive::new(file).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::TempDir;

    use crate::model::TransmissionFormat;

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

    fn roots(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        (
            dir.path().join("received"),
            dir.path().join("treated"),
            dir.path().join("error"),
        )
    }

    #[test]
    fn returns_at_most_two_hundred_entries() {
        let dir = TempDir::new().unwrap();
        let (received, treated, error) = roots(&dir);
        let partition = received.join("2021").join("1");
        fs::create_dir_all(&partition).unwrap();

        for i in 0..=MAX_ARCHIVES_PER_SCAN {
            write_zip(
                &partition.join(format!("ERS3_JBE{i:012}.zip")),
                &[("m.xml", "<OPS/>")],
            );
        }

        let entries = scan(&received, &treated, &error).unwrap();

        assert_eq!(entries.len(), MAX_ARCHIVES_PER_SCAN);
        // Nothing was moved: the surplus file waits for the next invocation.
        assert_eq!(fs::read_dir(&partition).unwrap().count(), MAX_ARCHIVES_PER_SCAN + 1);
        assert!(!error.exists());
    }

    #[test]
    fn classifies_conforming_files_and_moves_the_rest() {
        let dir = TempDir::new().unwrap();
        let (received, treated, error) = roots(&dir);
        let partition = received.join("2021").join("1");
        fs::create_dir_all(&partition).unwrap();

        write_zip(&partition.join("UN_JBE202101123004.zip"), &[("m.xml", "x")]);
        write_zip(&partition.join("ERS3_JBE202101123000.zip"), &[("m.xml", "x")]);
        write_zip(
            &partition.join("ERS3_ACK_JBE202101123003.zip"),
            &[("m.xml", "x")],
        );
        fs::write(partition.join("unexpected_non_zipfile.txt"), "hello").unwrap();
        write_zip(
            &partition.join("unexpected_zipfile_JBE123456789012.zip"),
            &[("m.xml", "x")],
        );

        let entries = scan(&received, &treated, &error).unwrap();

        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert_eq!(entry.received_dir, partition);
            assert_eq!(entry.treated_dir, treated.join("2021").join("1"));
            assert_eq!(entry.error_dir, error.join("2021").join("1"));
        }

        let formats: Vec<(&str, TransmissionFormat)> = entries
            .iter()
            .map(|e| (e.file_name.as_str(), e.transmission_format))
            .collect();
        assert!(formats.contains(&("UN_JBE202101123004.zip", TransmissionFormat::Flux)));
        assert!(formats.contains(&("ERS3_JBE202101123000.zip", TransmissionFormat::Ers3)));
        assert!(formats.contains(&("ERS3_ACK_JBE202101123003.zip", TransmissionFormat::Ers3)));

        // The two strays landed in the mirrored error partition.
        let error_partition = error.join("2021").join("1");
        assert!(error_partition.join("unexpected_non_zipfile.txt").is_file());
        assert!(
            error_partition
                .join("unexpected_zipfile_JBE123456789012.zip")
                .is_file()
        );

        // Conforming files were not touched.
        assert!(partition.join("UN_JBE202101123004.zip").is_file());
    }

    #[test]
    fn conforming_name_but_not_a_zip_is_moved_to_error() {
        let dir = TempDir::new().unwrap();
        let (received, treated, error) = roots(&dir);
        let partition = received.join("2021").join("2");
        fs::create_dir_all(&partition).unwrap();

        fs::write(partition.join("ERS3_JBE000000000001.zip"), "not a zip").unwrap();

        let entries = scan(&received, &treated, &error).unwrap();

        assert!(entries.is_empty());
        assert!(
            error
                .join("2021")
                .join("2")
                .join("ERS3_JBE000000000001.zip")
                .is_file()
        );
    }

    #[test]
    fn scanning_a_missing_root_returns_no_entries() {
        let dir = TempDir::new().unwrap();
        let (received, treated, error) = roots(&dir);

        let entries = scan(&received, &treated, &error).unwrap();
        assert!(entries.is_empty());
    }
}
