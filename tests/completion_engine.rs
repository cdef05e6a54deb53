//! Integration tests for workspace-backed completion
//!
//! Tests verify:
//! - Candidates from other files in the workspace, with their origin
//! - Unreadable files are skipped without failing the request
//! - A scan that overruns its timeout marks the result incomplete
//! - A position past the end of the document fails the request
//! - Dropping a pending scan stops the blocking walk

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indoc::indoc;
use tempfile::TempDir;
use tower_lsp::lsp_types::{Position, Url};

use glsl_language_server::lsp::completion::CompletionEngine;
use glsl_language_server::lsp::config::{CompletionConfig, ScannerConfig};
use glsl_language_server::lsp::document::DocumentStore;
use glsl_language_server::lsp::errors::CoreError;
use glsl_language_server::lsp::models::SymbolKind;
use glsl_language_server::lsp::scanner::{CancellationFlag, WorkspaceScanner};

fn engine(settings: CompletionConfig) -> (Arc<DocumentStore>, Arc<WorkspaceScanner>, CompletionEngine) {
    let store = Arc::new(DocumentStore::new());
    let scanner = Arc::new(WorkspaceScanner::new(&ScannerConfig::default()));
    let engine = CompletionEngine::new(store.clone(), scanner.clone(), settings);
    (store, scanner, engine)
}

fn without_keywords() -> CompletionConfig {
    CompletionConfig {
        include_keywords: false,
        ..CompletionConfig::default()
    }
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(
        dir.path().join("lib").join("lighting.glsl"),
        indoc! {"
            uniform vec3 lightDir;
            float shadowBias = 0.005;
            vec3 shade(vec3 normal) { return normal; }
        "},
    )
    .unwrap();
    fs::write(dir.path().join("broken.frag"), [0x66, 0x6c, 0xff, 0xfe, 0x3b]).unwrap();
    fs::write(dir.path().join("README.md"), "float notShader;").unwrap();
    dir
}

fn file_uri(path: &Path) -> Url {
    Url::from_file_path(path).unwrap()
}

#[tokio::test]
async fn test_workspace_declarations_with_origin() {
    let dir = workspace();
    let (store, _scanner, engine) = engine(without_keywords());
    let uri = file_uri(&dir.path().join("main.frag"));
    store.open(&uri, "void main() { sha }".to_string(), Some(1));

    let outcome = engine.complete(&uri, Position::new(0, 17)).await.unwrap();

    let names: Vec<&str> = outcome.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["shade", "shadowBias"]);
    assert!(outcome.items.iter().all(|s| s.kind == SymbolKind::Declaration));
    let origin = outcome.items[0].origin.as_deref().unwrap();
    assert!(origin.ends_with(Path::new("lib").join("lighting.glsl")));
    assert!(!outcome.is_incomplete());
}

#[tokio::test]
async fn test_unreadable_files_are_skipped() {
    let dir = workspace();
    let (_store, scanner, engine) = engine(without_keywords());

    let report = engine.scan_workspace(dir.path().to_path_buf(), Duration::from_secs(10)).await.unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path.as_deref().unwrap().ends_with("broken.frag"));
    assert!(report.symbols.iter().any(|s| s.name == "lightDir"));
    assert!(!report.symbols.iter().any(|s| s.name == "notShader"));
    assert!(!report.cancelled);
    assert!(scanner.cache_stats().misses >= 1);
}

#[tokio::test]
async fn test_current_document_shadows_workspace_origin() {
    let dir = workspace();
    let (store, _scanner, engine) = engine(without_keywords());
    let path = dir.path().join("main.frag");
    let uri = file_uri(&path);
    store.open(&uri, "float lightDir;\nvoid main() { lig }".to_string(), None);

    let outcome = engine.complete(&uri, Position::new(1, 17)).await.unwrap();

    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].origin.as_deref(), Some(path.as_path()));
}

#[tokio::test]
async fn test_scan_of_missing_root_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone");
    let (_store, _scanner, engine) = engine(CompletionConfig::default());

    let result = engine.scan_workspace(missing.clone(), Duration::from_secs(1)).await;
    assert_eq!(result.unwrap_err(), CoreError::InvalidRoot(missing));
}

#[tokio::test]
async fn test_missing_root_still_offers_document_and_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _scanner, engine) = engine(CompletionConfig::default());
    let uri = file_uri(&dir.path().join("sub").join("a.glsl"));
    store.open(&uri, "float texCoordScale;\nvoid main() { tex }".to_string(), None);

    let outcome = engine.complete(&uri, Position::new(1, 17)).await.unwrap();

    let names: Vec<&str> = outcome.items.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"texCoordScale"));
    assert!(names.contains(&"texture"));
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_scan_timeout_marks_result_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    for d in 0..20 {
        let sub = dir.path().join(format!("d{}", d));
        fs::create_dir(&sub).unwrap();
        for i in 0..100 {
            fs::write(sub.join(format!("s{}.glsl", i)), format!("float value{}_{};\n", d, i)).unwrap();
        }
    }
    let settings = CompletionConfig {
        scan_timeout_ms: 0,
        ..without_keywords()
    };
    let (store, _scanner, engine) = engine(settings);
    let uri = file_uri(&dir.path().join("main.glsl"));
    store.open(&uri, "void main() { val }".to_string(), None);

    let outcome = engine.complete(&uri, Position::new(0, 17)).await.unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.is_incomplete());
}

#[tokio::test]
async fn test_unresolvable_position_is_an_error() {
    let (store, _scanner, engine) = engine(without_keywords());
    let uri = Url::parse("file:///a.glsl").unwrap();
    store.open(&uri, "void main() {}".to_string(), None);

    let result = engine.complete(&uri, Position::new(99, 0)).await;
    assert_eq!(result.unwrap_err(), CoreError::LineOutOfRange { line: 99, line_count: 1 });

    let unknown = Url::parse("file:///unknown.glsl").unwrap();
    assert!(engine.complete(&unknown, Position::new(99, 0)).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_dropped_scan_stops_the_walk() {
    const FILES: u64 = 4000;
    let dir = tempfile::tempdir().unwrap();
    for d in 0..40 {
        let sub = dir.path().join(format!("d{:02}", d));
        fs::create_dir(&sub).unwrap();
        for i in 0..FILES / 40 {
            fs::write(sub.join(format!("s{:03}.glsl", i)), format!("float value{}_{};\n", d, i)).unwrap();
        }
    }
    let (_store, scanner, engine) = engine(without_keywords());
    let flag = CancellationFlag::new();

    let pending = engine.scan_workspace_with(dir.path().to_path_buf(), Duration::from_secs(60), flag.clone());
    let dropped = tokio::time::timeout(Duration::from_millis(2), pending).await;
    assert!(dropped.is_err());
    assert!(flag.is_cancelled());

    // The worker notices the flag at its next entry; wait until its counter settles.
    let mut read = scanner.cache_stats().misses;
    loop {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let now = scanner.cache_stats().misses;
        if now == read {
            break;
        }
        read = now;
    }
    assert!(read < FILES, "walk read {} of {} files after the request was dropped", read, FILES);
}
