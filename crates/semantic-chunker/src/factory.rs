use crate::chunker::Chunker;
use crate::code::CodeChunker;
use crate::config::{ChunkingConfig, ChunkingStrategyConfig};
use crate::error::{ChunkerError, Result};
use crate::fallback::FallbackChunker;
use crate::grammar::GrammarRegistry;
use crate::markdown::MarkdownChunker;
use crate::types::{extension_of, Chunk, Document};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A document left out of a batch, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub file_path: String,
    pub reason: String,
}

/// Result of chunking a batch of documents
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<SkippedDocument>,
}

/// Picks a chunker per document and runs batches.
///
/// The factory is immutable once built and can be shared across threads.
pub struct ChunkingFactory {
    config: ChunkingConfig,
    grammars: Arc<GrammarRegistry>,
    chunkers: Vec<Arc<dyn Chunker>>,
    by_extension: HashMap<String, usize>,
    fallback: FallbackChunker,
}

impl ChunkingFactory {
    /// Factory with no language chunkers; everything uses the fallback
    pub fn new(config: ChunkingConfig, grammars: Arc<GrammarRegistry>) -> Self {
        Self {
            config,
            grammars,
            chunkers: Vec::new(),
            by_extension: HashMap::new(),
            fallback: FallbackChunker::new(),
        }
    }

    /// Factory with the built-in code and markdown chunkers registered
    pub fn with_default_chunkers(config: ChunkingConfig, grammars: Arc<GrammarRegistry>) -> Self {
        let mut factory = Self::new(config, Arc::clone(&grammars));
        for language in CodeChunker::languages() {
            factory.register_chunker(CodeChunker::new(language, Arc::clone(&grammars)));
        }
        factory.register_chunker(MarkdownChunker::new(grammars));
        factory
    }

    /// Register a chunker for all of its extensions.
    ///
    /// A later registration wins for any extension it shares with an earlier one.
    pub fn register_chunker(&mut self, chunker: impl Chunker + 'static) {
        let index = self.chunkers.len();
        for ext in chunker.extensions() {
            if let Some(previous) = self.by_extension.insert(ext.to_string(), index) {
                log::debug!(
                    "Extension .{ext} moved from {} to {}",
                    self.chunkers[previous].name(),
                    chunker.name()
                );
            }
        }
        self.chunkers.push(Arc::new(chunker));
    }

    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn grammars(&self) -> &GrammarRegistry {
        &self.grammars
    }

    fn registered(&self, extension: &str) -> Option<&dyn Chunker> {
        let chunker = self.chunkers.get(*self.by_extension.get(extension)?)?;
        match chunker.language() {
            Some(language) if !self.grammars.is_language_loaded(language) => None,
            _ => Some(chunker.as_ref()),
        }
    }

    /// Chunker for a path: the registered one when its grammar is loaded,
    /// otherwise the fallback
    pub fn get_chunker(&self, file_path: &str) -> &dyn Chunker {
        self.select(extension_of(file_path).as_deref())
    }

    fn select(&self, extension: Option<&str>) -> &dyn Chunker {
        if !(self.config.enabled && self.config.use_ast_parsing) {
            return &self.fallback;
        }
        extension
            .and_then(|ext| self.registered(ext))
            .unwrap_or(&self.fallback)
    }

    /// Strategy applied to a path, after dispatch
    pub fn strategy_for(&self, file_path: &str) -> ChunkingStrategyConfig {
        let extension = extension_of(file_path);
        self.strategy_for_extension(extension.as_deref())
    }

    fn strategy_for_extension(&self, extension: Option<&str>) -> ChunkingStrategyConfig {
        let fallback = self.config.fallback.as_strategy();
        if !self.config.enabled {
            return fallback;
        }

        let strategy = extension.and_then(|ext| self.config.get_strategy_config(ext));
        let structured = extension.and_then(|ext| self.registered(ext)).is_some();
        match strategy {
            // Without AST parsing the fallback splitter still honours per-extension sizes.
            Some(strategy) if structured || !self.config.use_ast_parsing => strategy.clone(),
            None if structured => ChunkingStrategyConfig::default(),
            _ => fallback,
        }
    }

    /// Chunk a single document
    pub fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.config.max_file_size_bytes();
        if document.content.len() > limit {
            return Err(ChunkerError::DocumentTooLarge {
                file_path: document.file_path().to_string(),
                size: document.content.len(),
                limit,
            });
        }

        let extension = document.extension();
        let chunker = self.select(extension.as_deref());
        let strategy = self.strategy_for_extension(extension.as_deref());
        log::debug!(
            "Chunking {} with {} (max {}, overlap {})",
            document.file_path(),
            chunker.name(),
            strategy.max_chunk_size,
            strategy.chunk_overlap
        );

        chunker.chunk(document, &strategy)
    }

    /// Chunk one document, turning errors and panics into a skip record
    fn chunk_isolated(&self, document: &Document) -> std::result::Result<Vec<Chunk>, SkippedDocument> {
        let file_path = document.file_path();
        let reason = match catch_unwind(AssertUnwindSafe(|| self.chunk_document(document))) {
            Ok(Ok(chunks)) => return Ok(chunks),
            Ok(Err(e)) if e.is_document_scoped() => e.to_string(),
            Ok(Err(e)) => {
                log::error!("Chunking {file_path} failed: {e}");
                e.to_string()
            }
            Err(panic) => panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .map_or_else(|| "chunker panicked".to_string(), |msg| format!("chunker panicked: {msg}")),
        };

        log::warn!("Skipping {file_path}: {reason}");
        Err(SkippedDocument {
            file_path: file_path.to_string(),
            reason,
        })
    }

    /// Chunk a batch; failing documents are logged and left out
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        self.chunk_documents_with_report(documents).chunks
    }

    /// Chunk a batch and report which documents were skipped
    pub fn chunk_documents_with_report(&self, documents: &[Document]) -> BatchOutcome {
        collect_outcome(documents.iter().map(|doc| self.chunk_isolated(doc)))
    }

    /// Like [`Self::chunk_documents_with_report`], spread over the rayon pool.
    ///
    /// Output order matches input order.
    pub fn chunk_documents_parallel(&self, documents: &[Document]) -> BatchOutcome {
        let results: Vec<_> = documents
            .par_iter()
            .map(|doc| self.chunk_isolated(doc))
            .collect();
        collect_outcome(results)
    }

    /// Extensions with a registered chunker
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.by_extension.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Registered chunker names and the extensions each one owns
    pub fn chunker_info(&self) -> BTreeMap<String, Vec<String>> {
        let mut info: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (ext, index) in &self.by_extension {
            info.entry(self.chunkers[*index].name().to_string())
                .or_default()
                .push(ext.clone());
        }
        for extensions in info.values_mut() {
            extensions.sort();
        }
        info
    }

    /// Why an extension gets no structure-aware chunking, if it doesn't
    pub fn get_language_error_message(&self, extension: &str) -> Option<String> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        if !self.by_extension.contains_key(&ext) {
            return Some(format!(
                "No chunker is registered for '.{ext}'; files are split with the fallback chunker"
            ));
        }
        self.grammars.error_message(&ext)
    }

    /// Grammar load status per known extension
    pub fn grammar_status(&self) -> BTreeMap<String, bool> {
        self.grammars.status()
    }
}

impl std::fmt::Debug for ChunkingFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkingFactory")
            .field("config", &self.config)
            .field("grammars", &self.grammars)
            .field("chunkers", &self.chunker_info())
            .finish()
    }
}

fn collect_outcome(
    results: impl IntoIterator<Item = std::result::Result<Vec<Chunk>, SkippedDocument>>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for result in results {
        match result {
            Ok(chunks) => outcome.chunks.extend(chunks),
            Err(skipped) => outcome.skipped.push(skipped),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::types::ChunkType;
    use pretty_assertions::assert_eq;

    struct Exploding;

    impl Chunker for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn extensions(&self) -> Vec<&'static str> {
            vec!["boom"]
        }

        fn language(&self) -> Option<Language> {
            None
        }

        fn chunk(&self, document: &Document, _: &ChunkingStrategyConfig) -> Result<Vec<Chunk>> {
            panic!("cannot chunk {}", document.file_path());
        }
    }

    fn factory() -> ChunkingFactory {
        ChunkingFactory::with_default_chunkers(
            ChunkingConfig::default(),
            Arc::new(GrammarRegistry::new()),
        )
    }

    #[test]
    fn test_dispatch_by_extension() {
        let factory = factory();
        assert_eq!(factory.get_chunker("src/app.py").name(), "python_chunker");
        assert_eq!(factory.get_chunker("src/lib.rs").name(), "rust_chunker");
        assert_eq!(factory.get_chunker("web/App.TSX").name(), "tsx_chunker");
        assert_eq!(factory.get_chunker("README.md").name(), "markdown_chunker");
        assert_eq!(factory.get_chunker("build.zig").name(), "fallback");
        assert_eq!(factory.get_chunker("Makefile").name(), "fallback");
    }

    #[test]
    fn test_unloaded_grammar_routes_to_fallback() {
        let grammars = Arc::new(GrammarRegistry::with_languages([Language::Rust]));
        let factory = ChunkingFactory::with_default_chunkers(ChunkingConfig::default(), grammars);

        assert_eq!(factory.get_chunker("main.rs").name(), "rust_chunker");
        assert_eq!(factory.get_chunker("main.py").name(), "fallback");
        assert_eq!(factory.strategy_for("main.py"), ChunkingConfig::default().fallback.as_strategy());
        assert!(factory
            .get_language_error_message("py")
            .is_some_and(|msg| msg.contains("python")));
        assert!(factory.get_language_error_message("rs").is_none());
    }

    #[test]
    fn test_disabled_and_no_ast_modes() {
        let disabled = ChunkingFactory::with_default_chunkers(
            ChunkingConfig {
                enabled: false,
                ..Default::default()
            },
            Arc::new(GrammarRegistry::new()),
        );
        assert_eq!(disabled.get_chunker("main.rs").name(), "fallback");
        assert_eq!(disabled.strategy_for("main.rs").max_chunk_size, 1000);

        let no_ast = ChunkingFactory::with_default_chunkers(
            ChunkingConfig {
                use_ast_parsing: false,
                ..Default::default()
            },
            Arc::new(GrammarRegistry::new()),
        );
        assert_eq!(no_ast.get_chunker("main.rs").name(), "fallback");
        assert_eq!(no_ast.strategy_for("main.rs").max_chunk_size, 2000);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let mut factory = factory();
        factory.register_chunker(Exploding);

        let config = ChunkingConfig {
            max_file_size_mb: 0.0001,
            ..Default::default()
        };
        let big = "x".repeat(config.max_file_size_bytes() + 1);
        let documents = vec![
            Document::new("def ok():\n    return 1\n", "ok.py"),
            Document::new("anything", "bad.boom"),
            Document::new("   \n", "empty.py"),
            Document::new("fn main() {}\n", "main.rs"),
        ];

        let outcome = factory.chunk_documents_with_report(&documents);
        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].file_path, "bad.boom");
        assert!(outcome.skipped[0].reason.contains("panicked"));

        let small = ChunkingFactory::with_default_chunkers(config, Arc::new(GrammarRegistry::new()));
        let err = small.chunk_document(&Document::new(big, "huge.txt")).unwrap_err();
        assert!(matches!(err, ChunkerError::DocumentTooLarge { .. }));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let factory = factory();
        let documents: Vec<Document> = (0..8)
            .map(|i| Document::new(format!("def f{i}():\n    return {i}\n"), format!("m{i}.py")))
            .collect();

        let sequential = factory.chunk_documents_with_report(&documents);
        let parallel = factory.chunk_documents_parallel(&documents);
        assert_eq!(sequential.chunks, parallel.chunks);
        assert!(parallel.skipped.is_empty());
    }

    #[test]
    fn test_unknown_extension_uses_fallback_type() {
        let chunks = factory()
            .chunk_document(&Document::new("some notes\nmore notes\n", "notes.zzz"))
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.chunk_type, ChunkType::Fallback);
    }

    #[test]
    fn test_registry_info() {
        let factory = factory();
        let info = factory.chunker_info();
        assert_eq!(info["python_chunker"], vec!["py".to_string(), "pyw".to_string()]);
        assert_eq!(info["markdown_chunker"], vec!["markdown".to_string(), "md".to_string()]);
        assert!(factory.supported_extensions().contains(&"cs".to_string()));
        assert!(factory.grammar_status().values().all(|loaded| *loaded));
    }
}
