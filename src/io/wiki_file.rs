use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::buffer::VecBuffer;

/// Error type for wiki file I/O
#[derive(Debug, thiserror::Error)]
pub enum WikiFileError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
}

/// Read a wiki file into a line buffer
pub fn load_wiki(path: &Path) -> Result<VecBuffer, WikiFileError> {
    let text = fs::read_to_string(path).map_err(|e| WikiFileError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(VecBuffer::from_text(&text))
}

/// Write a line buffer back to its wiki file, atomically
pub fn save_wiki(path: &Path, buffer: &VecBuffer) -> Result<(), WikiFileError> {
    atomic_write(path, buffer.to_text().as_bytes()).map_err(|e| WikiFileError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write through a temp file in the same directory, then rename over the target
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
