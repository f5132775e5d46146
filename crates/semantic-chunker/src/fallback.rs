//! Separator-based splitting that never looks at a syntax tree.

use crate::chunker::{assemble, ChunkLabel, Chunker};
use crate::config::ChunkingStrategyConfig;
use crate::error::Result;
use crate::language::Language;
use crate::packer::{pack, Budget, Segmentation};
use crate::types::{Chunk, ChunkType, Document};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Where a separator match allows a cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    Before,
    After,
}

#[derive(Debug)]
struct Separator {
    pattern: Regex,
    cut: Cut,
}

impl Separator {
    fn new(pattern: &str, cut: Cut) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("separator patterns are valid regexes"),
            cut,
        }
    }

    fn positions<'t>(&'t self, text: &'t str) -> impl Iterator<Item = usize> + 't {
        self.pattern.find_iter(text).map(move |m| match self.cut {
            Cut::Before => m.start(),
            Cut::After => m.end(),
        })
    }
}

/// Markdown heading levels, most structural first
static HEADINGS: Lazy<Vec<Separator>> = Lazy::new(|| {
    (1..=6)
        .map(|level| Separator::new(&format!(r"(?m)^ {{0,3}}#{{{level}}}[ \t]"), Cut::Before))
        .collect()
});

/// Separators finer than headings shared by all markup content
static MARKUP_BODY: Lazy<Vec<Separator>> = Lazy::new(|| {
    vec![
        Separator::new(
            r"(?m)^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$",
            Cut::Before,
        ),
        Separator::new(r"(?m)^[ \t]*(?:[-*+]|\d{1,9}[.)])[ \t]+", Cut::Before),
        Separator::new(r"\n[ \t]*\n", Cut::After),
        Separator::new(r"\n", Cut::After),
        Separator::new(r"[ \t]+", Cut::After),
    ]
});

/// Paragraph break, newline, space
static GENERIC: Lazy<Vec<Separator>> = Lazy::new(|| {
    vec![
        Separator::new(r"\n[ \t]*\n", Cut::After),
        Separator::new(r"\n", Cut::After),
        Separator::new(r"[ \t]+", Cut::After),
    ]
});

static HAS_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]\S").expect("heading pattern is a valid regex"));

const MARKUP_EXTENSIONS: &[&str] = &["md", "markdown", "mdx", "rst", "adoc", "asciidoc"];

/// Whether a document should be split with the markup separator hierarchy
pub(crate) fn is_markup(extension: Option<&str>, content: &str) -> bool {
    match extension {
        Some(ext) if MARKUP_EXTENSIONS.contains(&ext) => true,
        Some("txt") => HAS_HEADING.is_match(content),
        _ => false,
    }
}

/// Level at which heading-free markup separators start
pub(crate) const MARKUP_BODY_LEVEL: usize = 7;

/// Add list-item, paragraph, line and word candidates from `first_level` on
pub(crate) fn add_markup_body(text: &str, segmentation: &mut Segmentation, first_level: usize) {
    for (offset, separator) in MARKUP_BODY.iter().enumerate() {
        segmentation.extend(first_level + offset, separator.positions(text));
    }
}

/// Line-aligned spans of fenced code blocks (``` or ~~~).
///
/// An unclosed fence runs to the end of the text.
pub(crate) fn fenced_blocks(text: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start_matches(' ');
        let indent = line.len() - trimmed.len();
        let fence = trimmed
            .chars()
            .next()
            .filter(|c| indent <= 3 && (*c == '`' || *c == '~'))
            .map(|c| (c, trimmed.chars().take_while(|&x| x == c).count()))
            .filter(|(_, run)| *run >= 3);

        match (open, fence) {
            (None, Some((marker, run))) => open = Some((offset, marker, run)),
            (Some((start, marker, run)), Some((c, closing)))
                if c == marker && closing >= run && trimmed[closing..].trim().is_empty() =>
            {
                blocks.push(start..offset + line.len());
                open = None;
            }
            _ => {}
        }
        offset += line.len();
    }

    if let Some((start, _, _)) = open {
        blocks.push(start..text.len());
    }
    blocks
}

/// Splits any text with an ordered separator hierarchy
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackChunker;

impl FallbackChunker {
    pub const NAME: &'static str = "fallback";

    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Candidate cut positions for `text`
    fn segment(text: &str, markup: bool) -> Segmentation {
        let mut segmentation = Segmentation::new();
        if markup {
            for (level, separator) in HEADINGS.iter().enumerate() {
                segmentation.extend(level, separator.positions(text));
            }
            for block in fenced_blocks(text) {
                segmentation.add(HEADINGS.len(), block.start);
                segmentation.add(HEADINGS.len(), block.end);
                segmentation.add_atomic(block);
            }
            add_markup_body(text, &mut segmentation, MARKUP_BODY_LEVEL);
        } else {
            for (level, separator) in GENERIC.iter().enumerate() {
                segmentation.extend(level, separator.positions(text));
            }
        }
        segmentation.finish(text.len())
    }

    /// Split with explicit sizes (characters)
    pub fn split(&self, document: &Document, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
        let text = &document.content;
        if text.trim().is_empty() {
            return Vec::new();
        }

        let extension = document.extension();
        let markup = is_markup(extension.as_deref(), text);
        let segmentation = Self::segment(text, markup);
        let windows = pack(text, &segmentation, Budget::new(chunk_size, chunk_overlap));

        let language = extension
            .as_deref()
            .and_then(Language::from_extension)
            .map_or("text", Language::as_str);

        assemble(document, &windows, language, Self::NAME, |_| ChunkLabel {
            chunk_type: ChunkType::Fallback,
            ..Default::default()
        })
    }
}

impl Chunker for FallbackChunker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn extensions(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn language(&self) -> Option<Language> {
        None
    }

    fn chunk(&self, document: &Document, config: &ChunkingStrategyConfig) -> Result<Vec<Chunk>> {
        Ok(self.split(document, config.max_chunk_size, config.chunk_overlap))
    }
}
