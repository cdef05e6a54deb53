//! LSP protocol handler implementations
//!
//! This module contains the `tower_lsp::LanguageServer` implementation for
//! the GLSL backend:
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_save, did_close)
//! - Completion

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use tower_lsp::{LanguageServer, jsonrpc};
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    InitializeParams, InitializeResult, InitializedParams, MessageType, SaveOptions,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
};
use tracing::{debug, info, warn};

use super::state::GlslBackend;
use super::utils::to_completion_response;
use super::{SERVER_NAME, SERVER_VERSION};
use crate::lsp::models::directory_of;

impl GlslBackend {
    fn workspace_root_from(params: &InitializeParams) -> Option<PathBuf> {
        #[allow(deprecated)]
        let root_uri = params.root_uri.as_ref();
        root_uri
            .and_then(|uri| uri.to_file_path().ok())
            .or_else(|| {
                params
                    .workspace_folders
                    .as_ref()
                    .and_then(|folders| folders.first())
                    .and_then(|folder| folder.uri.to_file_path().ok())
            })
    }

    fn capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(true),
                })),
                ..Default::default()
            })),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec![".".to_string(), "_".to_string()]),
                resolve_provider: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for GlslBackend {
    /// Handles the LSP initialize request, seeding the workspace root and settings.
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize: process_id={:?}", params.process_id);

        match Self::workspace_root_from(&params) {
            Some(root) => {
                info!("Workspace root: {}", root.display());
                self.session.store.set_root(root);
            }
            None => debug!("Initialize carried no file workspace root"),
        }

        if let Some(options) = params.initialization_options.as_ref() {
            self.session
                .completion
                .reconfigure(|settings| settings.merge_initialization_options(options));
            debug!("Completion settings: {:?}", self.session.completion.settings());
        }

        Ok(InitializeResult {
            capabilities: Self::capabilities(),
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(SERVER_VERSION.to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Initialized");
        self.client
            .log_message(MessageType::INFO, format!("{} {} ready", SERVER_NAME, SERVER_VERSION))
            .await;
    }

    /// Handles the LSP shutdown request. Repeated requests are acknowledged.
    async fn shutdown(&self) -> jsonrpc::Result<()> {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            debug!("Received repeated shutdown request");
        } else {
            info!("Received shutdown request");
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        info!("Opening document: URI={}, version={}", doc.uri, doc.version);
        let version = self.session.store.open(&doc.uri, doc.text, Some(doc.version));
        debug!("Opened {} at store version {}", doc.uri, version);
    }

    /// Applies the last content change as the full new text.
    async fn did_change(&self, mut params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(change) = params.content_changes.pop() else {
            warn!("textDocument/didChange for {} carried no changes", uri);
            return;
        };
        if change.range.is_some() {
            debug!("Treating ranged change for {} as full text", uri);
        }

        let outcome = self
            .session
            .store
            .apply_full_text(&uri, change.text, Some(params.text_document.version));
        if outcome.implicit_open {
            info!("Implicitly opened {} on change", uri);
        }
        debug!("Document {} now at version {}", uri, outcome.version);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("textDocument/didSave: {}", uri);
        match params.text {
            Some(text) => {
                let outcome = self.session.store.apply_full_text(&uri, text, None);
                debug!("Saved {} at version {}", uri, outcome.version);
            }
            None => {
                if let Some(dir) = directory_of(&uri) {
                    self.session.store.set_root(dir);
                }
            }
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if self.session.store.close(&uri) {
            info!("Closed document: {}", uri);
        } else {
            debug!("textDocument/didClose for unknown document {}", uri);
        }
    }

    async fn completion(&self, params: CompletionParams) -> jsonrpc::Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        debug!("textDocument/completion: {} at {:?}", uri, position);

        let outcome = match self.session.completion.complete(&uri, position).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("textDocument/completion failed for {} at {:?}: {}", uri, position, e);
                return Err(jsonrpc::Error::invalid_params(e.to_string()));
            }
        };
        let root = self.session.store.current_root();
        Ok(Some(to_completion_response(outcome, root.as_deref())))
    }
}
