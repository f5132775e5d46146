use crate::config::ChunkingStrategyConfig;
use crate::error::Result;
use crate::language::Language;
use crate::packer::Window;
use crate::text::{char_len, LineIndex};
use crate::types::{Chunk, ChunkMetadata, ChunkType, Document, Symbol, SymbolKind};
use std::collections::HashMap;
use std::ops::Range;

/// A chunking strategy for one family of documents.
///
/// Implementations are stateless between calls and shared across worker
/// threads, so `chunk` must not mutate `self`.
pub trait Chunker: Send + Sync {
    /// Registry name, unique per factory
    fn name(&self) -> &str;

    /// Extensions this chunker claims (lowercase, no dot)
    fn extensions(&self) -> Vec<&'static str>;

    /// Grammar the chunker needs; `None` means it always works
    fn language(&self) -> Option<Language>;

    /// Split a document into ordered chunks
    fn chunk(&self, document: &Document, config: &ChunkingStrategyConfig) -> Result<Vec<Chunk>>;
}

/// Per-window labels computed by a chunker
#[derive(Debug, Clone, Default)]
pub(crate) struct ChunkLabel {
    pub chunk_type: ChunkType,
    pub symbols: Vec<String>,
    pub contains_documentation: bool,
}

/// Turn packed windows into chunks with full metadata
pub(crate) fn assemble(
    document: &Document,
    windows: &[Window],
    language: &str,
    chunker: &str,
    mut label: impl FnMut(&Range<usize>) -> ChunkLabel,
) -> Vec<Chunk> {
    let content = &document.content;
    let lines = LineIndex::new(content);
    let total_chunks = windows.len();

    windows
        .iter()
        .enumerate()
        .map(|(chunk_index, window)| {
            let range = window.range.clone();
            let text = &content[range.clone()];
            let ChunkLabel {
                chunk_type,
                symbols,
                contains_documentation,
            } = label(&range);

            Chunk {
                content: text.to_string(),
                metadata: ChunkMetadata {
                    document: document.metadata.clone(),
                    chunk_index,
                    total_chunks,
                    chunk_size: char_len(text),
                    chunk_type,
                    language: language.to_string(),
                    symbols,
                    contains_documentation,
                    chunker: chunker.to_string(),
                    oversized: window.oversized,
                    truncated: false,
                    start_line: lines.line_of(range.start),
                    end_line: lines.line_of(range.end.saturating_sub(1).max(range.start)),
                    start_byte: range.start,
                    end_byte: range.end,
                    estimated_tokens: ChunkMetadata::estimate_tokens_from_content(text),
                },
            }
        })
        .collect()
}

/// Dominant kind among weighted symbol kinds.
///
/// The winner must cover at least half of the total weight, otherwise the
/// chunk is `mixed`. Equal weights go to the higher dominance rank.
pub(crate) fn dominant_kind(weights: impl IntoIterator<Item = (SymbolKind, usize)>) -> ChunkType {
    let mut totals: HashMap<SymbolKind, usize> = HashMap::new();
    for (kind, weight) in weights {
        if weight > 0 {
            *totals.entry(kind).or_default() += weight;
        }
    }

    let total: usize = totals.values().sum();
    let best = totals
        .into_iter()
        .max_by_key(|&(kind, weight)| (weight, kind.dominance_rank(), std::cmp::Reverse(kind)));

    match best {
        Some((kind, weight)) if total > 0 && weight * 2 >= total => kind.into(),
        _ => ChunkType::Mixed,
    }
}

/// Names of the non-comment symbols intersecting `range`, first seen first
pub(crate) fn symbol_names<'a>(
    symbols: impl IntoIterator<Item = &'a Symbol>,
    range: &Range<usize>,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for symbol in symbols {
        if symbol.kind.is_documentation() || symbol.overlap(range) == 0 {
            continue;
        }
        if let Some(name) = &symbol.name {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Statistics about chunking results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub oversized_chunks: usize,
    pub fallback_chunks: usize,
}

impl ChunkingStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let total_tokens: usize = chunks.iter().map(Chunk::estimated_tokens).sum();
        Self {
            total_chunks: chunks.len(),
            total_lines: chunks.iter().map(Chunk::line_count).sum(),
            total_tokens,
            avg_tokens_per_chunk: total_tokens.checked_div(chunks.len()).unwrap_or(0),
            min_tokens: chunks
                .iter()
                .map(Chunk::estimated_tokens)
                .min()
                .unwrap_or(0),
            max_tokens: chunks
                .iter()
                .map(Chunk::estimated_tokens)
                .max()
                .unwrap_or(0),
            oversized_chunks: chunks.iter().filter(|c| c.metadata.oversized).count(),
            fallback_chunks: chunks
                .iter()
                .filter(|c| c.metadata.chunk_type == ChunkType::Fallback)
                .count(),
        }
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | Tokens: {} | Avg: {} | Range: {}-{} | Oversized: {} | Fallback: {}",
            self.total_chunks,
            self.total_lines,
            self.total_tokens,
            self.avg_tokens_per_chunk,
            self.min_tokens,
            self.max_tokens,
            self.oversized_chunks,
            self.fallback_chunks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn symbol(name: &str, kind: SymbolKind, bytes: Range<usize>) -> Symbol {
        Symbol {
            name: Some(name.to_string()),
            kind,
            line_start: 1,
            line_end: 1,
            byte_start: bytes.start,
            byte_end: bytes.end,
            depth: 0,
            parent: None,
        }
    }

    #[test]
    fn test_dominant_kind_majority() {
        let kind = dominant_kind([(SymbolKind::Function, 70), (SymbolKind::Import, 30)]);
        assert_eq!(kind, ChunkType::Function);
    }

    #[test]
    fn test_dominant_kind_tie_prefers_class() {
        let kind = dominant_kind([(SymbolKind::Function, 50), (SymbolKind::Class, 50)]);
        assert_eq!(kind, ChunkType::Class);

        let kind = dominant_kind([(SymbolKind::Import, 40), (SymbolKind::Method, 40)]);
        assert_eq!(kind, ChunkType::Method);
    }

    #[test]
    fn test_dominant_kind_mixed() {
        let kind = dominant_kind([
            (SymbolKind::Function, 40),
            (SymbolKind::Import, 30),
            (SymbolKind::Constant, 30),
        ]);
        assert_eq!(kind, ChunkType::Mixed);
        assert_eq!(dominant_kind([]), ChunkType::Mixed);
    }

    #[test]
    fn test_symbol_names_skip_comments_and_duplicates() {
        let symbols = vec![
            symbol("doc", SymbolKind::Comment, 0..10),
            symbol("Point", SymbolKind::Struct, 10..50),
            symbol("Point", SymbolKind::Impl, 50..90),
            symbol("new", SymbolKind::Method, 60..80),
            symbol("later", SymbolKind::Function, 100..120),
        ];
        assert_eq!(symbol_names(&symbols, &(0..95)), vec!["Point", "new"]);
    }

    #[test]
    fn test_assemble_fills_positions() {
        let document = Document::new("one\ntwo\nthree\n", "notes.txt").with_metadata("branch", "main");
        let windows = vec![
            Window {
                range: 0..8,
                oversized: false,
            },
            Window {
                range: 4..14,
                oversized: false,
            },
        ];

        let chunks = assemble(&document, &windows, "text", "fallback", |_| ChunkLabel {
            chunk_type: ChunkType::Fallback,
            ..Default::default()
        });

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "one\ntwo\n");
        assert_eq!((chunks[0].metadata.start_line, chunks[0].metadata.end_line), (1, 2));
        assert_eq!((chunks[1].metadata.start_line, chunks[1].metadata.end_line), (2, 3));
        assert_eq!((chunks[1].metadata.start_byte, chunks[1].metadata.end_byte), (4, 14));
        assert!(chunks.iter().all(|c| c.metadata.total_chunks == 2));
        assert_eq!(chunks[1].metadata.chunk_index, 1);
        assert_eq!(chunks[1].metadata.document.extra["branch"], "main");

        let stats = ChunkingStats::from_chunks(&chunks);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.fallback_chunks, 2);
        assert!(stats.to_string().starts_with("Chunks: 2 | Lines: 4"));
    }
}
