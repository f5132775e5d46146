//! # Semantic Chunker
//!
//! Structure-aware splitting of source files into bounded, overlapping chunks
//! for embedding and retrieval.
//!
//! ## Philosophy
//!
//! Chunks follow the shape of the code:
//! - Definitions, comments and imports stay together where they fit
//! - Size and overlap budgets are honoured in characters
//! - Content is a contiguous slice of the file, never rewritten or truncated
//! - Files without a working grammar still get sensible separator-based chunks
//!
//! ## Architecture
//!
//! ```text
//! Document
//!     │
//!     ├──> ChunkingFactory (extension → chunker, grammar loaded?)
//!     │
//!     ├──> CodeChunker / MarkdownChunker
//!     │    ├─> SyntaxAnalyzer: tree-sitter parse → symbols + boundaries
//!     │    ├─> Units and split candidates by level
//!     │    └─> Greedy packing with character overlap
//!     │
//!     ├──> FallbackChunker (no grammar, parse failure, AST disabled)
//!     │    └─> Separator hierarchy: headings → fences → paragraphs → lines → words
//!     │
//!     └──> Chunk[] with document metadata + chunk details
//! ```
//!
//! ## Example
//!
//! ```rust
//! use semantic_chunker::{ChunkingConfig, ChunkingFactory, Document, GrammarRegistry};
//! use std::sync::Arc;
//!
//! let grammars = Arc::new(GrammarRegistry::new());
//! let factory = ChunkingFactory::with_default_chunkers(ChunkingConfig::default(), grammars);
//!
//! let code = r#"
//! fn process_data(input: &str) -> String {
//!     input.trim().to_uppercase()
//! }
//! "#;
//!
//! let chunks = factory.chunk_document(&Document::new(code, "example.rs")).unwrap();
//! for chunk in &chunks {
//!     println!(
//!         "Chunk at lines {}-{}: {} {:?}",
//!         chunk.metadata.start_line, chunk.metadata.end_line, chunk.metadata.chunk_type, chunk.metadata.symbols
//!     );
//! }
//! ```

mod ast_analyzer;
mod chunker;
mod code;
mod config;
mod error;
mod factory;
mod fallback;
mod grammar;
mod language;
mod markdown;
mod packer;
mod text;
mod types;

pub use ast_analyzer::{Analysis, SyntaxAnalyzer, SyntaxTree};
pub use chunker::{Chunker, ChunkingStats};
pub use code::CodeChunker;
pub use config::{
    ChunkingConfig, ChunkingStrategyConfig, ConfigManager, FallbackConfig, CONFIG_ENV_VAR,
};
pub use error::{ChunkerError, ParseUnavailable, Result};
pub use factory::{BatchOutcome, ChunkingFactory, SkippedDocument};
pub use fallback::FallbackChunker;
pub use grammar::GrammarRegistry;
pub use language::Language;
pub use markdown::MarkdownChunker;
pub use types::{
    BoundarySet, Chunk, ChunkMetadata, ChunkType, Document, DocumentMetadata, Symbol, SymbolKind,
};
