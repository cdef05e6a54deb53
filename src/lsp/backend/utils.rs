//! Mapping from core values to protocol types.

use std::path::Path;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, CompletionList, CompletionResponse};

use crate::lsp::models::{CandidateSymbol, CompletionOutcome, SymbolKind};

/// Maps one candidate to a completion item.
///
/// `detail` carries the origin file relative to `root` when it has one and is
/// left empty for keywords. `sort_text` is `rank` zero-padded to `width`
/// digits, which pins the engine's ordering so clients do not re-sort by label.
pub fn to_completion_item(symbol: &CandidateSymbol, root: Option<&Path>, rank: usize, width: usize) -> CompletionItem {
    let kind = match symbol.kind {
        SymbolKind::Declaration => CompletionItemKind::VARIABLE,
        SymbolKind::Keyword => CompletionItemKind::KEYWORD,
    };
    let detail = symbol.origin.as_deref().map(|origin| {
        root.and_then(|root| origin.strip_prefix(root).ok())
            .unwrap_or(origin)
            .display()
            .to_string()
    });

    CompletionItem {
        label: symbol.name.clone(),
        kind: Some(kind),
        detail,
        sort_text: Some(format!("{:0width$}", rank, width = width)),
        ..Default::default()
    }
}

pub(super) fn to_completion_response(outcome: CompletionOutcome, root: Option<&Path>) -> CompletionResponse {
    let is_incomplete = outcome.is_incomplete();
    let width = sort_width(outcome.items.len());
    let items = outcome
        .items
        .iter()
        .enumerate()
        .map(|(rank, symbol)| to_completion_item(symbol, root, rank, width))
        .collect();
    CompletionResponse::List(CompletionList { is_incomplete, items })
}

/// Digits needed for the largest rank in a list of `count` items, at least 6.
fn sort_width(count: usize) -> usize {
    count.saturating_sub(1).to_string().len().max(6)
}
