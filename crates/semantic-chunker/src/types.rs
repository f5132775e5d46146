use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

/// Opaque metadata bag attached to an input document.
///
/// `file_path` and `file_type` are the only keys the engine reads; everything
/// else (repository, branch, ...) is threaded through to every chunk unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Source file path
    pub file_path: String,

    /// File type hint (extension, with or without the leading dot)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    /// Any other caller-provided keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A source file handed to the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document for a file path
    pub fn new(content: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                file_path: file_path.into(),
                ..Default::default()
            },
        }
    }

    /// Builder: set file type
    #[must_use]
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.metadata.file_type = Some(file_type.into());
        self
    }

    /// Builder: attach an extra metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.extra.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.metadata.file_path
    }

    /// Lowercase extension without the dot, from the path or the file type hint
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.metadata.file_path).or_else(|| {
            self.metadata
                .file_type
                .as_deref()
                .map(|ft| ft.trim_start_matches('.').to_lowercase())
                .filter(|ft| !ft.is_empty())
        })
    }
}

/// Lowercase extension of a path, without the dot
pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// A bounded slice of a document plus metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The chunk text, a contiguous slice of the document
    pub content: String,

    /// Document metadata enriched with chunk details
    pub metadata: ChunkMetadata,
}

impl Chunk {
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.metadata.document.file_path
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.metadata.end_line.saturating_sub(self.metadata.start_line) + 1
    }

    /// Get estimated token count
    #[must_use]
    pub const fn estimated_tokens(&self) -> usize {
        self.metadata.estimated_tokens
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.metadata.start_line && line <= self.metadata.end_line
    }
}

/// Metadata about a chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Metadata of the document this chunk came from
    #[serde(flatten)]
    pub document: DocumentMetadata,

    /// Position within the document's chunk list (0-based)
    pub chunk_index: usize,

    /// Number of chunks produced for the document
    pub total_chunks: usize,

    /// Length of the content in characters
    pub chunk_size: usize,

    /// Dominant symbol kind, `mixed` or `fallback`
    pub chunk_type: ChunkType,

    /// Language name (`text` for the fallback splitter)
    pub language: String,

    /// Names of the symbols the chunk touches
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Whether a comment or docstring starts inside the chunk
    pub contains_documentation: bool,

    /// Name of the chunker that produced the chunk
    pub chunker: String,

    /// A single indivisible unit exceeded the size budget
    #[serde(default)]
    pub oversized: bool,

    /// Content was cut short (never set by this engine)
    #[serde(default)]
    pub truncated: bool,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Byte span of the content in the document, end exclusive
    #[serde(default)]
    pub start_byte: usize,
    #[serde(default)]
    pub end_byte: usize,

    /// Estimated token count (rough approximation)
    pub estimated_tokens: usize,
}

impl ChunkMetadata {
    /// Estimate tokens from content (~4 chars per token for code)
    #[must_use]
    pub fn estimate_tokens_from_content(content: &str) -> usize {
        (content.len() / 4).max(1)
    }
}

/// Kind of a semantically significant node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Import,
    Class,
    Struct,
    Enum,
    Interface,
    Impl,
    Module,
    Function,
    Method,
    /// Wrapper around a definition: decorators or an `export` statement
    Decorated,
    TypeAlias,
    Constant,
    Macro,
    /// Comment or docstring
    Comment,
    /// Attribute or decorator written above the item it annotates
    Attribute,
    /// Markdown section (heading plus body)
    Section,
    /// Fenced code block in a markup document
    CodeBlock,
}

impl SymbolKind {
    /// Rank used to break ties when picking a chunk's dominant kind
    #[must_use]
    pub const fn dominance_rank(self) -> u8 {
        match self {
            Self::Class | Self::Struct | Self::Interface | Self::Enum | Self::Impl | Self::Module => 3,
            Self::Function | Self::Method | Self::Decorated => 2,
            Self::Import => 1,
            _ => 0,
        }
    }

    /// Containers whose members are methods
    #[must_use]
    pub const fn is_class_like(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Struct | Self::Enum | Self::Interface | Self::Impl | Self::Module
        )
    }

    #[must_use]
    pub const fn is_callable(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Decorated | Self::Macro)
    }

    #[must_use]
    pub const fn is_documentation(self) -> bool {
        matches!(self, Self::Comment)
    }

    /// Comments and attributes; they lead an item but are not one
    #[must_use]
    pub const fn is_prefix(self) -> bool {
        matches!(self, Self::Comment | Self::Attribute)
    }

    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Impl => "impl",
            Self::Module => "module",
            Self::Function => "function",
            Self::Method => "method",
            Self::Decorated => "decorated",
            Self::TypeAlias => "type_alias",
            Self::Constant => "constant",
            Self::Macro => "macro",
            Self::Comment => "comment",
            Self::Attribute => "attribute",
            Self::Section => "section",
            Self::CodeBlock => "code_block",
        }
    }
}

/// Type label recorded on a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Import,
    Class,
    Struct,
    Enum,
    Interface,
    Impl,
    Module,
    Function,
    Method,
    Decorated,
    TypeAlias,
    Constant,
    Macro,
    Comment,
    Attribute,
    Section,
    CodeBlock,
    /// No single kind dominates
    #[default]
    Mixed,
    /// Produced by the separator-based splitter
    Fallback,
}

impl ChunkType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mixed => "mixed",
            Self::Fallback => "fallback",
            Self::Import => "import",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Impl => "impl",
            Self::Module => "module",
            Self::Function => "function",
            Self::Method => "method",
            Self::Decorated => "decorated",
            Self::TypeAlias => "type_alias",
            Self::Constant => "constant",
            Self::Macro => "macro",
            Self::Comment => "comment",
            Self::Attribute => "attribute",
            Self::Section => "section",
            Self::CodeBlock => "code_block",
        }
    }
}

impl From<SymbolKind> for ChunkType {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Import => Self::Import,
            SymbolKind::Class => Self::Class,
            SymbolKind::Struct => Self::Struct,
            SymbolKind::Enum => Self::Enum,
            SymbolKind::Interface => Self::Interface,
            SymbolKind::Impl => Self::Impl,
            SymbolKind::Module => Self::Module,
            SymbolKind::Function => Self::Function,
            SymbolKind::Method => Self::Method,
            SymbolKind::Decorated => Self::Decorated,
            SymbolKind::TypeAlias => Self::TypeAlias,
            SymbolKind::Constant => Self::Constant,
            SymbolKind::Macro => Self::Macro,
            SymbolKind::Comment => Self::Comment,
            SymbolKind::Attribute => Self::Attribute,
            SymbolKind::Section => Self::Section,
            SymbolKind::CodeBlock => Self::CodeBlock,
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located point of interest in a syntax tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Identifier, when one could be resolved
    pub name: Option<String>,
    pub kind: SymbolKind,
    /// First line (1-indexed)
    pub line_start: usize,
    /// Last line (1-indexed, inclusive)
    pub line_end: usize,
    pub byte_start: usize,
    pub byte_end: usize,
    /// Number of enclosing symbols (0 = top level)
    pub depth: usize,
    /// Name of the enclosing symbol
    pub parent: Option<String>,
}

impl Symbol {
    #[must_use]
    pub const fn span(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.byte_end.saturating_sub(self.byte_start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.byte_end <= self.byte_start
    }

    /// Whether `other` lies entirely inside this symbol
    #[must_use]
    pub const fn encloses(&self, other: &Self) -> bool {
        self.byte_start <= other.byte_start && other.byte_end <= self.byte_end
    }

    /// Bytes of this symbol inside `range`
    #[must_use]
    pub fn overlap(&self, range: &Range<usize>) -> usize {
        let start = self.byte_start.max(range.start);
        let end = self.byte_end.min(range.end);
        end.saturating_sub(start)
    }
}

/// Sorted, de-duplicated line numbers (1-indexed) where a chunk may start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySet(Vec<usize>);

impl BoundarySet {
    pub fn from_lines(lines: impl IntoIterator<Item = usize>) -> Self {
        let mut lines: Vec<usize> = lines.into_iter().collect();
        lines.sort_unstable();
        lines.dedup();
        Self(lines)
    }

    #[must_use]
    pub fn lines(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        self.0.binary_search(&line).is_ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
