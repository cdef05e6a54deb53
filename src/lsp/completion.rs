//! Completion candidates at a cursor position.
//!
//! Candidates are gathered in priority order: declarations in the current
//! document's in-memory text, then the workspace scan, then keyword and
//! built-in seeds. They are filtered by the identifier prefix before the
//! cursor, deduplicated by name (first occurrence wins), ranked, and capped.
//!
//! The workspace scan runs on tokio's blocking pool with no document lock
//! held. It is bounded by the configured timeout and is cancelled when the
//! request future is dropped.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tower_lsp::lsp_types::{Position, Url};
use tracing::{debug, warn};

use super::config::CompletionConfig;
use super::document::DocumentStore;
use super::errors::{CoreError, CoreResult};
use super::lexer::{extract_declarations, is_identifier_char, keyword_seeds};
use super::models::{CandidateSymbol, CompletionOutcome};
use super::position::{char_to_byte, position_to_offset};
use super::scanner::{CancellationFlag, ScanReport, WorkspaceScanner};

/// How long a timed-out scan gets to hand back what it collected.
const CANCEL_GRACE: Duration = Duration::from_millis(50);

/// The identifier being typed at a cursor, and the text with that word blanked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorWord {
    /// Identifier characters immediately before the cursor; possibly empty.
    pub prefix: String,
    /// Document text with the whole word under the cursor replaced by a space.
    pub remainder: String,
}

/// Splits `text` at the char offset `cursor`.
///
/// Fails with [`CoreError::InvalidOffset`] when `cursor` is past the end.
pub fn cursor_word(text: &str, cursor: usize) -> CoreResult<CursorWord> {
    let byte = char_to_byte(text, cursor).ok_or(CoreError::InvalidOffset {
        offset: cursor,
        len: text.chars().count(),
    })?;

    let (before, after) = text.split_at(byte);
    let start = before
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_identifier_char(c))
        .last()
        .map_or(byte, |(idx, _)| idx);
    let end = after
        .char_indices()
        .find(|&(_, c)| !is_identifier_char(c))
        .map_or(text.len(), |(idx, _)| byte + idx);

    let mut remainder = String::with_capacity(text.len());
    remainder.push_str(&text[..start]);
    remainder.push(' ');
    remainder.push_str(&text[end..]);

    Ok(CursorWord {
        prefix: text[start..byte].to_string(),
        remainder,
    })
}

/// Filters, deduplicates, orders and caps candidates for `prefix`.
///
/// Exact-case prefix matches come first, then candidates sharing a longer
/// exact-case prefix with what was typed, then lexicographic order. A
/// `max_completions` of 0 means no cap.
pub fn rank_candidates(
    candidates: impl IntoIterator<Item = CandidateSymbol>,
    prefix: &str,
    settings: &CompletionConfig,
) -> CompletionOutcome {
    let mut seen = HashSet::new();
    let mut matched: Vec<(bool, usize, CandidateSymbol)> = Vec::new();

    for candidate in candidates {
        let exact = candidate.name.starts_with(prefix);
        let matches = exact || (!settings.case_sensitive && starts_with_ignore_case(&candidate.name, prefix));
        if !matches || !seen.insert(candidate.name.clone()) {
            continue;
        }
        let common = common_prefix_len(&candidate.name, prefix);
        matched.push((exact, common, candidate));
    }

    matched.sort_by(|(a_exact, a_common, a), (b_exact, b_common, b)| {
        (Reverse(*a_exact), Reverse(*a_common), &a.name).cmp(&(Reverse(*b_exact), Reverse(*b_common), &b.name))
    });

    let mut items: Vec<CandidateSymbol> = matched.into_iter().map(|(_, _, symbol)| symbol).collect();
    let truncated = settings.max_completions > 0 && items.len() > settings.max_completions;
    if truncated {
        items.truncate(settings.max_completions);
    }

    CompletionOutcome {
        items,
        truncated,
        cancelled: false,
    }
}

fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name.is_char_boundary(prefix.len())
        && name[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Assembles completion lists from the document store and a workspace scan.
#[derive(Debug)]
pub struct CompletionEngine {
    store: Arc<DocumentStore>,
    scanner: Arc<WorkspaceScanner>,
    settings: RwLock<CompletionConfig>,
}

impl CompletionEngine {
    pub fn new(store: Arc<DocumentStore>, scanner: Arc<WorkspaceScanner>, settings: CompletionConfig) -> Self {
        Self {
            store,
            scanner,
            settings: RwLock::new(settings),
        }
    }

    pub fn settings(&self) -> CompletionConfig {
        self.settings.read().clone()
    }

    pub fn reconfigure(&self, update: impl FnOnce(&mut CompletionConfig)) {
        update(&mut *self.settings.write());
    }

    /// Ranked candidates for the cursor at `position` in `uri`.
    ///
    /// An unknown document yields an empty outcome, and a scan that times out
    /// contributes whatever it had collected. A position the text cannot
    /// resolve fails with [`CoreError::LineOutOfRange`] or
    /// [`CoreError::InvalidOffset`].
    pub async fn complete(&self, uri: &Url, position: Position) -> CoreResult<CompletionOutcome> {
        let settings = self.settings();

        let snapshot = match self.store.read(uri) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("No completions: {}", e);
                return Ok(CompletionOutcome::empty());
            }
        };
        let offset = position_to_offset(&snapshot.text, position)?;
        let word = cursor_word(&snapshot.text, offset)?;
        debug!("Completion prefix {:?} at {}:{:?} (version {})", word.prefix, uri, position, snapshot.version);

        let origin = uri
            .to_file_path()
            .unwrap_or_else(|()| PathBuf::from(uri.path()));
        let mut candidates: Vec<CandidateSymbol> = extract_declarations(&word.remainder)
            .into_iter()
            .map(|name| CandidateSymbol::declaration(name, &origin))
            .collect();

        let mut cancelled = false;
        if settings.scan_workspace {
            if let Some(root) = self.store.current_root() {
                match self.scan_workspace(root, settings.scan_timeout()).await {
                    Ok(report) => {
                        cancelled = report.cancelled;
                        candidates.extend(report.symbols);
                    }
                    Err(CoreError::Cancelled) => cancelled = true,
                    Err(e) => debug!("Workspace candidates unavailable: {}", e),
                }
            }
        }

        if settings.include_keywords {
            candidates.extend(keyword_seeds().map(CandidateSymbol::keyword));
        }

        let mut outcome = rank_candidates(candidates, &word.prefix, &settings);
        outcome.cancelled = cancelled;
        debug!(
            "Returning {} completions for {} (truncated: {}, cancelled: {})",
            outcome.items.len(),
            uri,
            outcome.truncated,
            outcome.cancelled
        );
        Ok(outcome)
    }

    /// Runs a full scan of `root` on the blocking pool.
    ///
    /// On timeout the scan's flag is raised and its partial report is awaited
    /// for a short grace period; if it does not arrive the result is
    /// [`CoreError::Cancelled`]. Dropping the returned future also raises the
    /// flag, so an abandoned request stops its walk at the next entry.
    pub async fn scan_workspace(&self, root: PathBuf, timeout: Duration) -> CoreResult<ScanReport> {
        self.scan_workspace_with(root, timeout, CancellationFlag::new()).await
    }

    /// [`scan_workspace`](Self::scan_workspace) driven by a caller-owned flag.
    ///
    /// `cancel` is raised once this future completes or is dropped.
    pub async fn scan_workspace_with(
        &self,
        root: PathBuf,
        timeout: Duration,
        cancel: CancellationFlag,
    ) -> CoreResult<ScanReport> {
        let _cancel_on_drop = scopeguard::guard(cancel.clone(), |flag| flag.cancel());

        let scanner = self.scanner.clone();
        let flag = cancel.clone();
        let mut task = tokio::task::spawn_blocking(move || scanner.collect(&root, flag));

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("Workspace scan task failed: {}", e);
                Ok(ScanReport::default())
            }
            Err(_) => {
                debug!("Workspace scan exceeded {:?}, cancelling", timeout);
                cancel.cancel();
                match tokio::time::timeout(CANCEL_GRACE, task).await {
                    Ok(Ok(Ok(mut report))) => {
                        report.cancelled = true;
                        Ok(report)
                    }
                    _ => Err(CoreError::Cancelled),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::models::SymbolKind;

    fn names(outcome: &CompletionOutcome) -> Vec<&str> {
        outcome.items.iter().map(|s| s.name.as_str()).collect()
    }

    fn keyword_list(words: &[&str]) -> Vec<CandidateSymbol> {
        words.iter().map(|w| CandidateSymbol::keyword(*w)).collect()
    }

    #[test]
    fn test_cursor_word_prefix_and_remainder() {
        let text = "void main() { gl_FragCol }";
        let word = cursor_word(text, 24).unwrap();
        assert_eq!(word.prefix, "gl_FragCol");
        assert_eq!(word.remainder, "void main() {   }");
    }

    #[test]
    fn test_cursor_word_mid_identifier_blanks_whole_word() {
        let word = cursor_word("float myVariable;", 10).unwrap();
        assert_eq!(word.prefix, "myVa");
        assert_eq!(word.remainder, "float  ;");
    }

    #[test]
    fn test_cursor_word_empty_prefix_and_multibyte() {
        let word = cursor_word("é😀 ", 3).unwrap();
        assert_eq!(word.prefix, "");
        let word = cursor_word("😀ab", 3).unwrap();
        assert_eq!(word.prefix, "ab");
        assert_eq!(word.remainder, "😀 ");
        assert!(cursor_word("ab", 3).is_err());
    }

    #[test]
    fn test_rank_filters_and_orders() {
        let settings = CompletionConfig::default();
        let outcome = rank_candidates(keyword_list(&["texture", "textureLod", "dot", "texelFetch"]), "tex", &settings);
        assert_eq!(names(&outcome), vec!["texelFetch", "texture", "textureLod"]);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_rank_deduplicates_keeping_first() {
        let settings = CompletionConfig::default();
        let candidates = vec![
            CandidateSymbol::declaration("shade", std::path::Path::new("/ws/a.glsl")),
            CandidateSymbol::keyword("shade"),
        ];
        let outcome = rank_candidates(candidates, "sh", &settings);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].kind, SymbolKind::Declaration);
    }

    #[test]
    fn test_rank_case_insensitive_puts_exact_case_first() {
        let settings = CompletionConfig {
            case_sensitive: false,
            ..CompletionConfig::default()
        };
        let outcome = rank_candidates(keyword_list(&["LightColor", "lightDir", "LIGHT_COUNT", "dark"]), "Li", &settings);
        assert_eq!(names(&outcome), vec!["LightColor", "LIGHT_COUNT", "lightDir"]);

        let strict = rank_candidates(keyword_list(&["LightColor", "lightDir"]), "Li", &CompletionConfig::default());
        assert_eq!(names(&strict), vec!["LightColor"]);
    }

    #[test]
    fn test_rank_caps_result_count() {
        let settings = CompletionConfig {
            max_completions: 3,
            ..CompletionConfig::default()
        };
        let candidates: Vec<_> = (0..10).map(|i| CandidateSymbol::keyword(format!("name{}", i))).collect();
        let outcome = rank_candidates(candidates, "", &settings);
        assert_eq!(names(&outcome), vec!["name0", "name1", "name2"]);
        assert!(outcome.truncated);
    }
}
