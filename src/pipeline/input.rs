//! Input resolution: canonicalise the batch directories and list the PDFs.
//!
//! Listing is non-recursive. Only regular files whose name ends in `.pdf`
//! (any ASCII case) are picked up; whether they really are PDFs is the
//! worker's problem, so a renamed text file fails on its own without
//! affecting the rest of the batch.

use crate::error::BatchError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Canonicalise the input directory.
pub fn resolve_input_dir(path: &Path) -> Result<PathBuf, BatchError> {
    let resolved = std::fs::canonicalize(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BatchError::InputDirNotFound {
            path: path.to_path_buf(),
        },
        _ => BatchError::InputDirUnreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    if !resolved.is_dir() {
        return Err(BatchError::InputDirNotFound {
            path: path.to_path_buf(),
        });
    }
    debug!("Input directory: {}", resolved.display());
    Ok(resolved)
}

/// Create the output directory (and parents) if needed, then canonicalise it.
pub fn prepare_output_dir(path: &Path) -> Result<PathBuf, BatchError> {
    let create_err = |source| BatchError::OutputDirCreateFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(path).map_err(create_err)?;
    let resolved = std::fs::canonicalize(path).map_err(create_err)?;
    debug!("Output directory: {}", resolved.display());
    Ok(resolved)
}

/// Whether a file name has a `.pdf` extension, ignoring ASCII case.
pub fn is_pdf_name(name: &str) -> bool {
    name.len() > 4 && name.is_char_boundary(name.len() - 4) && {
        let ext = &name[name.len() - 4..];
        ext.eq_ignore_ascii_case(".pdf")
    }
}

/// File names of the PDFs directly inside `dir`, sorted.
pub fn list_pdfs(dir: &Path) -> Result<Vec<String>, BatchError> {
    let unreadable = |source| BatchError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Skipping non-UTF-8 file name: {}", raw.to_string_lossy());
                continue;
            }
        };
        if is_pdf_name(&name) && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_name() {
        assert!(is_pdf_name("a.pdf"));
        assert!(is_pdf_name("Scan 01.PDF"));
        assert!(is_pdf_name("mixed.PdF"));
        assert!(!is_pdf_name(".pdf"));
        assert!(!is_pdf_name("notes.txt"));
        assert!(!is_pdf_name("archive.pdf.zip"));
        assert!(!is_pdf_name("ελληνικά"));
    }

    #[test]
    fn test_list_pdfs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "c.pdf"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        std::fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let names = list_pdfs(dir.path()).unwrap();
        assert_eq!(names, vec!["A.PDF", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_missing_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, BatchError::InputDirNotFound { .. }));
    }

    #[test]
    fn test_input_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"x").unwrap();
        assert!(resolve_input_dir(&file).is_err());
    }

    #[test]
    fn test_prepare_output_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x").join("y");
        let resolved = prepare_output_dir(&out).unwrap();
        assert!(resolved.is_dir());
        // Idempotent.
        prepare_output_dir(&out).unwrap();
    }

    #[test]
    fn test_output_dir_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, b"x").unwrap();
        let err = prepare_output_dir(&blocker.join("sub")).unwrap_err();
        assert!(matches!(err, BatchError::OutputDirCreateFailed { .. }));
    }
}
