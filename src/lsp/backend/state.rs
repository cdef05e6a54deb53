//! Backend state management
//!
//! This module defines the `Session` owning the document store, workspace
//! scanner and completion engine, and the `GlslBackend` the LSP service drives.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tower_lsp::Client;

use crate::lsp::completion::CompletionEngine;
use crate::lsp::config::ServerConfig;
use crate::lsp::document::DocumentStore;
use crate::lsp::scanner::WorkspaceScanner;

/// Process-wide core state, built once at startup and passed to the backend.
#[derive(Debug, Clone)]
pub struct Session {
    pub store: Arc<DocumentStore>,
    pub scanner: Arc<WorkspaceScanner>,
    pub completion: Arc<CompletionEngine>,
}

impl Session {
    pub fn new(config: &ServerConfig) -> Self {
        let store = Arc::new(DocumentStore::new());
        let scanner = Arc::new(WorkspaceScanner::new(&config.scanner));
        let completion = Arc::new(CompletionEngine::new(
            store.clone(),
            scanner.clone(),
            config.completion.clone(),
        ));
        Self {
            store,
            scanner,
            completion,
        }
    }
}

/// The GLSL language server backend, handling LSP requests against a [`Session`].
#[derive(Debug, Clone)]
pub struct GlslBackend {
    pub(super) client: Client,
    pub(super) session: Session,
    pub(super) shutdown_requested: Arc<AtomicBool>,
}
