use crate::ast_analyzer::SyntaxAnalyzer;
use crate::chunker::{assemble, dominant_kind, symbol_names, ChunkLabel, Chunker};
use crate::config::ChunkingStrategyConfig;
use crate::error::Result;
use crate::fallback::{add_markup_body, FallbackChunker, MARKUP_BODY_LEVEL};
use crate::grammar::GrammarRegistry;
use crate::language::Language;
use crate::packer::{pack, Budget, Segmentation};
use crate::text::LineIndex;
use crate::types::{Chunk, Document, Symbol, SymbolKind};
use std::ops::Range;
use std::sync::Arc;

/// Deepest heading level that gets its own candidate level
const MAX_SECTION_LEVEL: usize = 5;

/// Chunker for markdown documents.
///
/// Sections from the grammar give heading-aware cuts; fenced code blocks are
/// never split.
#[derive(Debug, Clone)]
pub struct MarkdownChunker {
    analyzer: SyntaxAnalyzer,
    fallback: FallbackChunker,
}

impl MarkdownChunker {
    pub const NAME: &'static str = "markdown_chunker";

    pub fn new(grammars: Arc<GrammarRegistry>) -> Self {
        Self {
            analyzer: SyntaxAnalyzer::new(grammars),
            fallback: FallbackChunker::new(),
        }
    }

    fn segment(text: &str, lines: &LineIndex, symbols: &[Symbol]) -> Segmentation {
        let mut segmentation = Segmentation::new();

        for symbol in symbols {
            let start = lines.line_start(symbol.line_start);
            match symbol.kind {
                SymbolKind::Section => {
                    segmentation.add(symbol.depth.min(MAX_SECTION_LEVEL), start);
                }
                SymbolKind::CodeBlock => {
                    let end = lines.line_end(symbol.line_end);
                    segmentation.add(MAX_SECTION_LEVEL + 1, start);
                    segmentation.add(MAX_SECTION_LEVEL + 1, end);
                    segmentation.add_atomic(start..end);
                }
                _ => {}
            }
        }

        add_markup_body(text, &mut segmentation, MARKUP_BODY_LEVEL);
        segmentation.finish(text.len())
    }

    fn label(symbols: &[Symbol], range: &Range<usize>) -> ChunkLabel {
        let code_chars: usize = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::CodeBlock)
            .map(|s| s.overlap(range))
            .sum();
        let in_section = symbols
            .iter()
            .any(|s| s.kind == SymbolKind::Section && s.overlap(range) > 0);
        let prose_chars = if in_section {
            range.len().saturating_sub(code_chars)
        } else {
            0
        };

        ChunkLabel {
            chunk_type: dominant_kind([
                (SymbolKind::CodeBlock, code_chars),
                (SymbolKind::Section, prose_chars),
            ]),
            symbols: symbol_names(
                symbols.iter().filter(|s| s.kind == SymbolKind::Section),
                range,
            ),
            contains_documentation: true,
        }
    }
}

impl Chunker for MarkdownChunker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn extensions(&self) -> Vec<&'static str> {
        Language::Markdown.extensions()
    }

    fn language(&self) -> Option<Language> {
        Some(Language::Markdown)
    }

    fn chunk(&self, document: &Document, config: &ChunkingStrategyConfig) -> Result<Vec<Chunk>> {
        let text = &document.content;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tree = match self.analyzer.parse_language(text, Language::Markdown) {
            Ok(tree) => tree,
            Err(e) => {
                log::warn!(
                    "{}: {e}; falling back to separator chunking",
                    document.file_path()
                );
                return self.fallback.chunk(document, config);
            }
        };
        let symbols = self.analyzer.extract_symbols(&tree);

        let lines = LineIndex::new(text);
        let segmentation = Self::segment(text, &lines, &symbols);
        let windows = pack(
            text,
            &segmentation,
            Budget::new(config.max_chunk_size, config.chunk_overlap),
        );

        Ok(assemble(
            document,
            &windows,
            Language::Markdown.as_str(),
            Self::NAME,
            |range| Self::label(&symbols, range),
        ))
    }
}
