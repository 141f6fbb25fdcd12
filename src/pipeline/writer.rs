//! Safe output writer: never fails because of the text it is given.
//!
//! Rust strings are valid UTF-8 by construction, so [`write_text`] can only
//! fail on I/O. Lone surrogates are dropped where pdfium's UTF-16 is decoded;
//! bytes from worker pipes go through [`escape_invalid_utf8`].
//!
//! ## Atomic vs. direct writes
//!
//! With `atomic = true` the bytes go to a temp file in the destination
//! directory which is then renamed over the target, so an interrupted run
//! never leaves a truncated file behind for the skip-existing check to
//! mistake for a finished one. `atomic = false` truncates and rewrites the
//! destination in place.

use crate::error::ExtractError;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write UTF-8 text to `path`, creating or replacing it.
pub fn write_text(path: &Path, text: &str, atomic: bool) -> Result<(), ExtractError> {
    write_bytes(path, text.as_bytes(), atomic)
}

/// Decode bytes as UTF-8, replacing each invalid byte with a `\xNN` escape.
pub fn escape_invalid_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        for b in chunk.invalid() {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out
}

fn write_bytes(path: &Path, bytes: &[u8], atomic: bool) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::Write {
        path: path.to_path_buf(),
        source,
    };

    if !atomic {
        std::fs::write(path, bytes).map_err(write_err)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        return Ok(());
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {} (atomic)", bytes.len(), path.display());
    Ok(())
}
