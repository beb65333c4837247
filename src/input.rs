//! File list loading
//!
//! The list holds one path per line. Blank lines and lines whose first
//! non-whitespace character is `#` are skipped and never count toward the total.

use crate::error::InputListError;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One file to read, in list order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    /// Zero-based position among eligible lines
    pub ordinal: usize,
}

/// Load tasks from a list file, or from stdin when `source` is `-`
pub fn load_tasks(source: &Path) -> Result<Vec<FileTask>, InputListError> {
    if source == Path::new("-") {
        let stdin = io::stdin();
        return parse_tasks(stdin.lock(), source);
    }

    let file = File::open(source).map_err(|e| InputListError::Open {
        path: source.to_path_buf(),
        source: e,
    })?;
    parse_tasks(BufReader::new(file), source)
}

/// Parse tasks from any buffered reader; `origin` only labels errors
///
/// Lines are split on raw bytes, so paths that are not valid UTF-8 still
/// become tasks.
pub fn parse_tasks<R: BufRead>(reader: R, origin: &Path) -> Result<Vec<FileTask>, InputListError> {
    let mut tasks = Vec::new();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|e| InputListError::Read {
            path: origin.to_path_buf(),
            line: index + 1,
            source: e,
        })?;

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() || trimmed.starts_with(b"#") {
            continue;
        }

        tasks.push(FileTask {
            path: path_from_bytes(trimmed),
            ordinal: tasks.len(),
        });
    }

    tracing::debug!(count = tasks.len(), origin = %origin.display(), "Loaded file list");
    Ok(tasks)
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
