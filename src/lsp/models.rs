use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tower_lsp::lsp_types::Url;

/// Mutable state of an open document, guarded by [`LspDocument::state`].
#[derive(Debug)]
pub struct LspDocumentState {
    pub text: String,
    /// Store version: 1 on open, +1 on every accepted full-text update.
    pub version: u64,
    /// Last version number the client attached to a notification, if any.
    pub client_version: Option<i32>,
    /// Set under the write lock when the document is closed, so a racing
    /// update that still holds the `Arc` knows to retry against the store.
    pub closed: bool,
}

/// A document tracked by the [`DocumentStore`](super::document::DocumentStore).
#[derive(Debug)]
pub struct LspDocument {
    pub id: u32,
    pub uri: Url,
    /// Directory the document lives in, when the URI maps to a path.
    pub root: Option<PathBuf>,
    pub state: RwLock<LspDocumentState>,
}

/// Point-in-time copy of a document's text and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub uri: Url,
    pub text: String,
    pub version: u64,
}

/// Coarse classification of a completion candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Found by lexing a source file: a name following a type or qualifier.
    Declaration,
    /// A reserved word, built-in type, variable or function of the language.
    Keyword,
}

/// A name offered as a completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSymbol {
    pub name: String,
    /// File the name was first seen in; `None` for keywords and built-ins.
    pub origin: Option<PathBuf>,
    pub kind: SymbolKind,
}

impl CandidateSymbol {
    pub fn declaration(name: impl Into<String>, origin: &Path) -> Self {
        Self {
            name: name.into(),
            origin: Some(origin.to_path_buf()),
            kind: SymbolKind::Declaration,
        }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
            kind: SymbolKind::Keyword,
        }
    }
}

/// Outcome of a completion request before it is mapped to protocol items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub items: Vec<CandidateSymbol>,
    /// More candidates matched than the configured cap allowed.
    pub truncated: bool,
    /// The workspace scan was cancelled or timed out; `items` may be partial.
    pub cancelled: bool,
}

impl CompletionOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_incomplete(&self) -> bool {
        self.truncated || self.cancelled
    }
}

/// Directory containing the file a URI points at.
///
/// `file:` URIs are converted through the platform path rules; for any other
/// scheme the URI path is used as-is, which still yields a deterministic key.
pub fn directory_of(uri: &Url) -> Option<PathBuf> {
    let path = match uri.to_file_path() {
        Ok(path) => path,
        Err(()) => PathBuf::from(uri.path()),
    };
    path.parent().map(Path::to_path_buf)
}
