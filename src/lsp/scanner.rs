//! Workspace scanning for completion candidates.
//!
//! A scan walks the workspace root with `walkdir`, lexes every source file
//! whose extension matches, and yields one [`CandidateSymbol`] per distinct
//! name. The walk is lazy: nothing is read until the iterator is polled, and a
//! raised [`CancellationFlag`] stops it at the next entry. Entries are visited
//! in file name order, so a name's origin is the same on every platform.
//!
//! Entries that cannot be read are skipped. Each one is logged and recorded on
//! the scan as a [`ScanEntryError`]; the scan itself never fails after it has
//! started.
//!
//! Unchanged files are not re-read across scans: lexed names are kept in a
//! bounded LRU keyed by path and validated against the file's modification
//! time and length.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, FilterEntry, WalkDir};

use super::config::ScannerConfig;
use super::errors::{CoreError, CoreResult, ScanEntryError};
use super::lexer::extract_declarations;
use super::models::CandidateSymbol;

/// Shared flag used to abandon a scan from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
struct CachedFile {
    modified: Option<SystemTime>,
    len: u64,
    names: Arc<[String]>,
}

/// Hit/miss counters for the per-file cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct ScanCache {
    files: LruCache<PathBuf, CachedFile>,
    stats: ScanCacheStats,
}

#[derive(Debug)]
pub struct WorkspaceScanner {
    extensions: Vec<String>,
    max_depth: Option<usize>,
    skip_hidden: bool,
    cache: Option<Mutex<ScanCache>>,
}

impl WorkspaceScanner {
    pub fn new(config: &ScannerConfig) -> Self {
        let cache = NonZeroUsize::new(config.cache_capacity).map(|capacity| {
            Mutex::new(ScanCache {
                files: LruCache::new(capacity),
                stats: ScanCacheStats::default(),
            })
        });
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_depth: config.max_depth,
            skip_hidden: config.skip_hidden,
            cache,
        }
    }

    /// Starts a scan of `root`.
    ///
    /// Fails with [`CoreError::InvalidRoot`] when `root` is missing or is not
    /// a directory. Every call starts a fresh walk.
    pub fn scan(&self, root: &Path, cancel: CancellationFlag) -> CoreResult<SymbolScan<'_>> {
        match fs::metadata(root) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => return Err(CoreError::InvalidRoot(root.to_path_buf())),
        }

        let mut walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }
        let filter: fn(&DirEntry) -> bool = if self.skip_hidden { is_visible } else { |_| true };

        debug!("Scanning workspace {:?}", root);
        Ok(SymbolScan {
            scanner: self,
            walker: walker.into_iter().filter_entry(filter),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            errors: Vec::new(),
            cancel,
            cancelled: false,
            finished: false,
            files_scanned: 0,
        })
    }

    /// Drains a full scan into a vector, for callers that do not need laziness.
    pub fn collect(&self, root: &Path, cancel: CancellationFlag) -> CoreResult<ScanReport> {
        let mut scan = self.scan(root, cancel)?;
        let symbols: Vec<CandidateSymbol> = scan.by_ref().collect();
        Ok(ScanReport {
            symbols,
            errors: scan.errors,
            cancelled: scan.cancelled,
            files_scanned: scan.files_scanned,
        })
    }

    pub fn cache_stats(&self) -> ScanCacheStats {
        self.cache
            .as_ref()
            .map(|cache| cache.lock().stats)
            .unwrap_or_default()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Declared names of one file, from the cache when its metadata is unchanged.
    fn names_in(&self, path: &Path) -> Result<Arc<[String]>, ScanEntryError> {
        let metadata = fs::metadata(path)
            .map_err(|e| ScanEntryError::new(Some(path.to_path_buf()), e.to_string()))?;
        let modified = metadata.modified().ok();
        let len = metadata.len();

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock();
            let hit = cache
                .files
                .get(path)
                .filter(|cached| cached.modified == modified && cached.len == len && modified.is_some())
                .map(|cached| cached.names.clone());
            match hit {
                Some(names) => {
                    cache.stats.hits += 1;
                    trace!("Scan cache hit for {:?}", path);
                    return Ok(names);
                }
                None => cache.stats.misses += 1,
            }
        }

        let bytes = fs::read(path)
            .map_err(|e| ScanEntryError::new(Some(path.to_path_buf()), e.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ScanEntryError::new(Some(path.to_path_buf()), "file is not valid UTF-8"))?;
        let names: Arc<[String]> = extract_declarations(&text).into();

        if let Some(cache) = &self.cache {
            cache.lock().files.put(
                path.to_path_buf(),
                CachedFile { modified, len, names: names.clone() },
            );
        }
        Ok(names)
    }
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0
        || !entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// A finished scan, drained into memory.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub symbols: Vec<CandidateSymbol>,
    pub errors: Vec<ScanEntryError>,
    pub cancelled: bool,
    pub files_scanned: usize,
}

/// Lazy, finite sequence of candidates from one walk of the workspace.
pub struct SymbolScan<'a> {
    scanner: &'a WorkspaceScanner,
    walker: FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>,
    pending: VecDeque<CandidateSymbol>,
    seen: HashSet<String>,
    errors: Vec<ScanEntryError>,
    cancel: CancellationFlag,
    cancelled: bool,
    finished: bool,
    files_scanned: usize,
}

impl SymbolScan<'_> {
    /// Entries skipped so far.
    pub fn errors(&self) -> &[ScanEntryError] {
        &self.errors
    }

    /// Whether the walk stopped because its flag was raised.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    fn visit(&mut self, entry: DirEntry) {
        if !entry.file_type().is_file() || !self.scanner.matches_extension(entry.path()) {
            return;
        }
        match self.scanner.names_in(entry.path()) {
            Ok(names) => {
                self.files_scanned += 1;
                for name in names.iter() {
                    if self.seen.insert(name.clone()) {
                        self.pending.push_back(CandidateSymbol::declaration(name.clone(), entry.path()));
                    }
                }
            }
            Err(err) => self.skip(err),
        }
    }

    fn skip(&mut self, err: ScanEntryError) {
        warn!("Skipping workspace entry {}", err);
        self.errors.push(err);
    }
}

impl Iterator for SymbolScan<'_> {
    type Item = CandidateSymbol;

    fn next(&mut self) -> Option<CandidateSymbol> {
        loop {
            if let Some(symbol) = self.pending.pop_front() {
                return Some(symbol);
            }
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                debug!("Workspace scan cancelled after {} files", self.files_scanned);
                self.cancelled = true;
                self.finished = true;
                return None;
            }
            match self.walker.next() {
                Some(Ok(entry)) => self.visit(entry),
                Some(Err(err)) => self.skip(err.into()),
                None => {
                    debug!(
                        "Workspace scan finished: {} files, {} symbols, {} skipped entries",
                        self.files_scanned,
                        self.seen.len(),
                        self.errors.len()
                    );
                    self.finished = true;
                }
            }
        }
    }
}
