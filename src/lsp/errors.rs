//! Error taxonomy for the document store, position resolver and workspace scanner.
//!
//! None of these errors are fatal to the server: request handlers turn them into
//! empty results and notification handlers log them.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tower_lsp::lsp_types::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("offset {offset} is outside the text (length {len})")]
    InvalidOffset { offset: usize, len: usize },

    #[error("line {line} is past the end of the text ({line_count} lines)")]
    LineOutOfRange { line: u32, line_count: usize },

    #[error("document not open: {0}")]
    UnknownDocument(Url),

    #[error("workspace root is not a readable directory: {0:?}")]
    InvalidRoot(PathBuf),

    #[error("scan cancelled")]
    Cancelled,
}

pub type CoreResult<T> = Result<T, CoreError>;

/// A single directory entry the scanner had to skip.
///
/// Collected on the scan for diagnostics; never returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntryError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ScanEntryError {
    pub fn new(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanEntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<walkdir::Error> for ScanEntryError {
    fn from(err: walkdir::Error) -> Self {
        let message = if let Some(ancestor) = err.loop_ancestor() {
            format!("symlink loop back to {}", ancestor.display())
        } else {
            err.to_string()
        };
        Self {
            path: err.path().map(|p| p.to_path_buf()),
            message,
        }
    }
}
