//! Structure-aware chunking for programming languages.
//!
//! A file is cut into *units*: each outermost definition starts a unit at
//! the beginning of its line, pulled up over the attributes right above it
//! and optionally over the comment block above those. Units are packed greedily; a unit that does not fit is
//! split between its members, then at statement lines, then at any line.
//!
//! ```text
//! level 0  unit starts (definitions, free comments, imports)
//! level 1  nested members (methods) of a splittable unit
//! level 2  statement lines at the body's indentation
//! level 3  any line
//! ```

use crate::ast_analyzer::SyntaxAnalyzer;
use crate::chunker::{assemble, dominant_kind, symbol_names, ChunkLabel, Chunker};
use crate::config::ChunkingStrategyConfig;
use crate::error::Result;
use crate::fallback::FallbackChunker;
use crate::grammar::GrammarRegistry;
use crate::language::Language;
use crate::packer::{pack, Budget, Segmentation};
use crate::text::{indentation, LineIndex};
use crate::types::{Chunk, Document, Symbol, SymbolKind};
use std::ops::Range;
use std::sync::Arc;

const UNIT_LEVEL: usize = 0;
const MEMBER_LEVEL: usize = 1;
const STATEMENT_LEVEL: usize = 2;
const LINE_LEVEL: usize = 3;

/// Chunker for one grammar-backed programming language
#[derive(Debug, Clone)]
pub struct CodeChunker {
    language: Language,
    name: String,
    analyzer: SyntaxAnalyzer,
    fallback: FallbackChunker,
}

impl CodeChunker {
    pub fn new(language: Language, grammars: Arc<GrammarRegistry>) -> Self {
        Self {
            language,
            name: format!("{language}_chunker"),
            analyzer: SyntaxAnalyzer::new(grammars),
            fallback: FallbackChunker::new(),
        }
    }

    /// Languages handled by this chunker family
    pub fn languages() -> impl Iterator<Item = Language> {
        Language::ALL.into_iter().filter(|language| !language.is_markup())
    }
}

impl Chunker for CodeChunker {
    fn name(&self) -> &str {
        &self.name
    }

    fn extensions(&self) -> Vec<&'static str> {
        self.language.extensions()
    }

    fn language(&self) -> Option<Language> {
        Some(self.language)
    }

    fn chunk(&self, document: &Document, config: &ChunkingStrategyConfig) -> Result<Vec<Chunk>> {
        let text = &document.content;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tree = match self.analyzer.parse_language(text, self.language) {
            Ok(tree) => tree,
            Err(e) => {
                log::warn!(
                    "{}: {e}; falling back to separator chunking",
                    document.file_path()
                );
                return self.fallback.chunk(document, config);
            }
        };
        let analysis = self.analyzer.analyze_tree(&tree);
        let symbols = &analysis.symbols;

        let lines = LineIndex::new(text);
        let layout = Layout::new(text, &lines, symbols);
        let segmentation = layout.segment(config);
        let windows = pack(
            text,
            &segmentation,
            Budget::new(config.max_chunk_size, config.chunk_overlap),
        );

        Ok(assemble(
            document,
            &windows,
            self.language.as_str(),
            &self.name,
            |range| layout.label(range),
        ))
    }
}

/// Top-level structure of one parsed file
struct Layout<'a> {
    text: &'a str,
    lines: &'a LineIndex,
    symbols: &'a [Symbol],
    /// Outermost non-comment symbols, in source order
    top: Vec<&'a Symbol>,
    /// Kind of each top symbol, looking through decorators
    top_kinds: Vec<SymbolKind>,
    /// Comments not inside any top symbol
    free_comments: Vec<&'a Symbol>,
    comments: Vec<&'a Symbol>,
    attributes: Vec<&'a Symbol>,
}

impl<'a> Layout<'a> {
    fn new(text: &'a str, lines: &'a LineIndex, symbols: &'a [Symbol]) -> Self {
        let code: Vec<&Symbol> = symbols.iter().filter(|s| !s.kind.is_prefix()).collect();
        let top = outermost(&code);
        let top_kinds = top.iter().map(|s| effective_kind(&code, s)).collect();

        let comments: Vec<&Symbol> = symbols.iter().filter(|s| s.kind.is_documentation()).collect();
        let free_comments = comments
            .iter()
            .copied()
            .filter(|c| !top.iter().any(|t| t.encloses(c)))
            .collect();
        let attributes = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Attribute)
            .collect();

        Self {
            text,
            lines,
            symbols,
            top,
            top_kinds,
            free_comments,
            comments,
            attributes,
        }
    }

    /// Whether only whitespace and attributes precede the symbol on its first line
    fn starts_line(&self, symbol: &Symbol) -> bool {
        let mut pos = self.lines.line_start(symbol.line_start);
        if pos > symbol.byte_start {
            return false;
        }
        loop {
            let rest = &self.text[pos..symbol.byte_start];
            pos += rest.len() - rest.trim_start().len();
            if pos == symbol.byte_start {
                return true;
            }
            let attribute = self
                .attributes
                .iter()
                .find(|a| a.byte_start == pos && a.byte_end <= symbol.byte_start);
            match attribute {
                Some(attribute) => pos = attribute.byte_end,
                None => return false,
            }
        }
    }

    fn blank_lines(&self, lines: Range<usize>) -> bool {
        lines.into_iter().all(|line| {
            let start = self.lines.line_start(line);
            self.text[start..self.lines.line_end(line)].trim().is_empty()
        })
    }

    /// Pull `anchor` up over the attributes above it and, with
    /// `include_docstrings`, over the comment lines directly above it.
    ///
    /// Blank lines may separate an attribute from its item; comments must
    /// touch it.
    fn glue_prefix(
        &self,
        comments: &[&Symbol],
        mut anchor: usize,
        floor: usize,
        config: &ChunkingStrategyConfig,
    ) -> usize {
        let mut prefix: Vec<&Symbol> = self.attributes.clone();
        if config.include_docstrings {
            prefix.extend(comments.iter().copied());
        }
        prefix.sort_by_key(|p| (p.line_end, p.line_start));

        loop {
            let idx = prefix.partition_point(|p| p.line_end < anchor);
            let Some(above) = idx.checked_sub(1).map(|i| prefix[i]) else {
                return anchor;
            };
            let touches = above.line_end + 1 == anchor
                || (above.kind == SymbolKind::Attribute
                    && self.blank_lines(above.line_end + 1..anchor));
            if touches && above.line_start > floor && self.starts_line(above) {
                anchor = above.line_start;
            } else {
                return anchor;
            }
        }
    }

    /// First lines of the top-level units
    fn unit_anchor_lines(&self, config: &ChunkingStrategyConfig) -> Vec<usize> {
        let mut anchors = Vec::new();
        // (first line of the glued prefix block, line of the definition)
        let mut glued: Vec<Range<usize>> = Vec::new();
        let mut prev_end_line = 0;
        let mut top_anchors: Vec<Option<usize>> = Vec::with_capacity(self.top.len());

        for symbol in &self.top {
            let anchor = if symbol.line_start > prev_end_line && self.starts_line(symbol) {
                let line =
                    self.glue_prefix(&self.free_comments, symbol.line_start, prev_end_line, config);
                glued.push(line..symbol.line_start);
                Some(line)
            } else {
                None
            };
            top_anchors.push(anchor);
            anchors.extend(anchor);
            prev_end_line = prev_end_line.max(symbol.line_end);
        }

        for comment in &self.free_comments {
            let is_glued = glued.iter().any(|g| g.contains(&comment.line_start));
            if !is_glued && self.starts_line(comment) {
                anchors.push(comment.line_start);
            }
        }

        if config.include_imports {
            let block = self
                .top_kinds
                .iter()
                .take_while(|kind| **kind == SymbolKind::Import)
                .count();
            if let Some(definition) = self.top.get(block).filter(|_| block > 0) {
                let block_anchor = top_anchors[0].unwrap_or(self.top[0].line_start);
                let glue_end = definition.line_start;
                anchors.retain(|&line| line <= block_anchor || line > glue_end);
            }
        }

        anchors.sort_unstable();
        anchors.dedup();
        anchors
    }

    fn segment(&self, config: &ChunkingStrategyConfig) -> Segmentation {
        let mut segmentation = Segmentation::new();
        let len = self.text.len();

        let mut unit_starts: Vec<usize> = self
            .unit_anchor_lines(config)
            .into_iter()
            .map(|line| self.lines.line_start(line))
            .filter(|&offset| offset > 0 && offset < len)
            .collect();
        segmentation.extend(UNIT_LEVEL, unit_starts.iter().copied());

        unit_starts.insert(0, 0);
        unit_starts.push(len);
        for bounds in unit_starts.windows(2) {
            self.segment_unit(bounds[0]..bounds[1], config, &mut segmentation);
        }

        segmentation.extend(LINE_LEVEL, self.lines.interior_starts().iter().copied());
        segmentation.finish(len)
    }

    fn segment_unit(
        &self,
        unit: Range<usize>,
        config: &ChunkingStrategyConfig,
        segmentation: &mut Segmentation,
    ) {
        let members: Vec<(&Symbol, SymbolKind)> = self
            .top
            .iter()
            .zip(&self.top_kinds)
            .filter(|(s, _)| unit.contains(&s.byte_start))
            .map(|(s, k)| (*s, *k))
            .collect();

        let class_like = members.iter().any(|(_, kind)| kind.is_class_like());
        let callable = members.iter().any(|(_, kind)| kind.is_callable());
        let preserved = if class_like {
            config.preserve_classes
        } else {
            callable && config.preserve_methods
        };
        if preserved {
            segmentation.add_atomic(unit);
            return;
        }

        let unit_first_line = self.lines.line_of(unit.start);
        let lo = self.symbols.partition_point(|s| s.byte_start < unit.start);
        let hi = self.symbols.partition_point(|s| s.byte_start < unit.end);
        let nested: Vec<&Symbol> = self.symbols[lo..hi]
            .iter()
            .filter(|s| s.depth == 1 && !s.kind.is_prefix())
            .collect();

        for member in outermost(&nested) {
            if !self.starts_line(member) {
                continue;
            }
            let anchor = self.glue_prefix(&self.comments, member.line_start, unit_first_line, config);
            let start = self.lines.line_start(anchor);
            if start > unit.start {
                segmentation.add(MEMBER_LEVEL, start);
            }
            if config.preserve_methods && member.kind.is_callable() {
                let end = self.lines.line_end(member.line_end).min(unit.end);
                segmentation.add_atomic(start.max(unit.start)..end);
            }
        }

        if config.respect_indentation {
            let primary = members.iter().map(|(s, _)| *s).max_by_key(|s| s.len());
            let statements = self.statement_lines(&unit, primary);
            segmentation.extend(STATEMENT_LEVEL, statements);
        }
    }

    /// Line starts at the body's indentation inside a unit
    fn statement_lines(&self, unit: &Range<usize>, primary: Option<&Symbol>) -> Vec<usize> {
        let (first, last) = match primary {
            Some(symbol) => (symbol.line_start + 1, symbol.line_end),
            None => (
                self.lines.line_of(unit.start),
                self.lines.line_of(unit.end.saturating_sub(1)),
            ),
        };

        let body: Vec<(usize, usize)> = (first..=last)
            .filter_map(|line| {
                let start = self.lines.line_start(line);
                let end = self.lines.line_end(line);
                let content = &self.text[start..end];
                (!content.trim().is_empty()).then_some((start, indentation(content)))
            })
            .filter(|(start, _)| *start > unit.start && *start < unit.end)
            .collect();

        let target = match primary {
            Some(symbol) => {
                let header = &self.text[self.lines.line_start(symbol.line_start)..];
                let base = indentation(header);
                body.iter().map(|(_, indent)| *indent).filter(|i| *i > base).min()
            }
            None => body.iter().map(|(_, indent)| *indent).min(),
        };

        match target {
            Some(target) => body
                .into_iter()
                .filter(|(_, indent)| *indent == target)
                .map(|(start, _)| start)
                .collect(),
            None => Vec::new(),
        }
    }

    fn label(&self, range: &Range<usize>) -> ChunkLabel {
        let weights = self
            .top
            .iter()
            .zip(&self.top_kinds)
            .map(|(symbol, kind)| (*kind, symbol.overlap(range)));

        ChunkLabel {
            chunk_type: dominant_kind(weights),
            symbols: symbol_names(self.symbols, range),
            contains_documentation: self
                .comments
                .iter()
                .any(|c| range.contains(&c.byte_start)),
        }
    }
}

/// Symbols not enclosed by an earlier symbol in the list
fn outermost<'a>(symbols: &[&'a Symbol]) -> Vec<&'a Symbol> {
    let mut result: Vec<&Symbol> = Vec::new();
    let mut covered_until = 0;
    for symbol in symbols {
        if result.is_empty() || symbol.byte_start >= covered_until {
            covered_until = symbol.byte_end;
            result.push(symbol);
        }
    }
    result
}

/// Kind of a top symbol; a wrapper (decorators, `export`) takes its wrapped
/// item's kind, and a wrapper around no definition holds a value.
fn effective_kind(code: &[&Symbol], symbol: &Symbol) -> SymbolKind {
    if symbol.kind != SymbolKind::Decorated {
        return symbol.kind;
    }
    code.iter()
        .filter(|inner| inner.kind != SymbolKind::Decorated)
        .find(|inner| symbol.encloses(inner) && inner.byte_start >= symbol.byte_start)
        .map_or(SymbolKind::Constant, |inner| inner.kind)
}
