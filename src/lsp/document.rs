//! In-memory store of open documents.
//!
//! Every document sits behind its own lock inside a [`DashMap`], so operations
//! on one URI are serialized while operations on different URIs proceed
//! independently. The workspace root is a separate last-writer-wins register.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tower_lsp::lsp_types::Url;
use tracing::{debug, trace};

use super::errors::{CoreError, CoreResult};
use super::models::{DocumentSnapshot, LspDocument, LspDocumentState, directory_of};

/// Result of a lenient full-text update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub version: u64,
    /// The URI was unknown and the update was treated as an open.
    pub implicit_open: bool,
}

/// Directory used as the base for workspace symbol scans.
#[derive(Debug, Default)]
pub struct WorkspaceRoot {
    dir: RwLock<Option<PathBuf>>,
}

impl WorkspaceRoot {
    pub fn get(&self) -> Option<PathBuf> {
        self.dir.read().clone()
    }

    pub fn set(&self, dir: PathBuf) {
        let mut guard = self.dir.write();
        if guard.as_ref() != Some(&dir) {
            debug!("Workspace root is now {:?}", dir);
        }
        *guard = Some(dir);
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Arc<LspDocument>>,
    serial_document_id: AtomicU32,
    root: WorkspaceRoot,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_document_id(&self) -> u32 {
        self.serial_document_id.fetch_add(1, Ordering::SeqCst)
    }

    fn new_document(&self, uri: &Url, text: String, client_version: Option<i32>) -> Arc<LspDocument> {
        Arc::new(LspDocument {
            id: self.next_document_id(),
            uri: uri.clone(),
            root: directory_of(uri),
            state: RwLock::new(LspDocumentState {
                text,
                version: 1,
                client_version,
                closed: false,
            }),
        })
    }

    fn touch_root(&self, document: &LspDocument) {
        if let Some(dir) = &document.root {
            self.root.set(dir.clone());
        }
    }

    /// Creates or replaces the document for `uri` at version 1.
    pub fn open(&self, uri: &Url, text: String, client_version: Option<i32>) -> u64 {
        let document = self.new_document(uri, text, client_version);
        self.touch_root(&document);
        debug!("Opened document: {}, id: {}", uri, document.id);

        if let Some(previous) = self.documents.insert(uri.clone(), document) {
            // Anyone still holding the old Arc must retry against the map.
            previous.state.write().closed = true;
            trace!("Replaced document id {} for {}", previous.id, uri);
        }
        1
    }

    /// Replaces the text of an open document and bumps its version.
    ///
    /// Fails with [`CoreError::UnknownDocument`] when `uri` is not open.
    pub fn update(&self, uri: &Url, text: String, client_version: Option<i32>) -> CoreResult<u64> {
        loop {
            let document = self
                .documents
                .get(uri)
                .map(|r| r.value().clone())
                .ok_or_else(|| CoreError::UnknownDocument(uri.clone()))?;

            let mut state = document.state.write();
            if state.closed {
                continue;
            }
            state.text = text;
            state.version += 1;
            if client_version.is_some() {
                state.client_version = client_version;
            }
            let version = state.version;
            drop(state);

            self.touch_root(&document);
            debug!("Updated document: {}, id: {}, version: {}", uri, document.id, version);
            return Ok(version);
        }
    }

    /// Full-text update that opens the document when the URI is unknown.
    ///
    /// Notifications can arrive out of order (a change before its open, or
    /// after a close), so the protocol handlers use this instead of
    /// [`update`](Self::update).
    pub fn apply_full_text(&self, uri: &Url, text: String, client_version: Option<i32>) -> SyncOutcome {
        loop {
            let document = match self.documents.entry(uri.clone()) {
                Entry::Vacant(vacant) => {
                    let document = self.new_document(uri, text, client_version);
                    self.touch_root(&document);
                    debug!("Implicitly opened document: {}, id: {}", uri, document.id);
                    vacant.insert(document);
                    return SyncOutcome { version: 1, implicit_open: true };
                }
                Entry::Occupied(occupied) => occupied.get().clone(),
            };

            let mut state = document.state.write();
            if state.closed {
                continue;
            }
            state.text = text;
            state.version += 1;
            if client_version.is_some() {
                state.client_version = client_version;
            }
            let version = state.version;
            drop(state);

            self.touch_root(&document);
            debug!("Updated document: {}, id: {}, version: {}", uri, document.id, version);
            return SyncOutcome { version, implicit_open: false };
        }
    }

    /// Removes the document. Closing an unknown URI is a no-op.
    pub fn close(&self, uri: &Url) -> bool {
        match self.documents.remove(uri) {
            Some((_, document)) => {
                document.state.write().closed = true;
                debug!("Closed document: {}, id: {}", uri, document.id);
                true
            }
            None => {
                trace!("Close for unknown document {}", uri);
                false
            }
        }
    }

    /// Snapshot of the current text and version.
    pub fn read(&self, uri: &Url) -> CoreResult<DocumentSnapshot> {
        self.with_document(uri, |state| DocumentSnapshot {
            uri: uri.clone(),
            text: state.text.clone(),
            version: state.version,
        })
    }

    /// Runs `f` while holding the document's read lock.
    ///
    /// Writers to the same URI wait until `f` returns; other URIs are unaffected.
    pub fn with_document<R>(&self, uri: &Url, f: impl FnOnce(&LspDocumentState) -> R) -> CoreResult<R> {
        loop {
            let document = self
                .documents
                .get(uri)
                .map(|r| r.value().clone())
                .ok_or_else(|| CoreError::UnknownDocument(uri.clone()))?;

            let state = document.state.read();
            if state.closed {
                continue;
            }
            return Ok(f(&state));
        }
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn current_root(&self) -> Option<PathBuf> {
        self.root.get()
    }

    /// Seeds the workspace root, e.g. from the client's `rootUri`.
    pub fn set_root(&self, dir: PathBuf) {
        self.root.set(dir);
    }
}
