use crate::error::{ChunkerError, Result};
use crate::language::Language;
use std::collections::{BTreeMap, HashMap};
use tree_sitter::Parser;

/// Grammar bindings for every language the engine can parse.
///
/// Built once at startup and shared read-only afterwards. Binding failures
/// are logged and recorded rather than returned, so a broken grammar only
/// routes its files to the fallback splitter.
#[derive(Default)]
pub struct GrammarRegistry {
    grammars: HashMap<Language, tree_sitter::Language>,
    failures: HashMap<Language, String>,
}

impl GrammarRegistry {
    /// Bind every known language
    #[must_use]
    pub fn new() -> Self {
        Self::with_languages(Language::ALL)
    }

    /// Bind only the requested languages
    pub fn with_languages(languages: impl IntoIterator<Item = Language>) -> Self {
        let mut registry = Self::empty();
        for language in languages {
            registry.register(language, language.tree_sitter_language());
        }
        log::debug!(
            "Grammar registry ready: {} loaded, {} failed",
            registry.grammars.len(),
            registry.failures.len()
        );
        registry
    }

    /// Registry without any grammar; every document goes to the fallback
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind a grammar to a language, replacing any previous binding
    pub fn register(&mut self, language: Language, grammar: tree_sitter::Language) {
        let mut parser = Parser::new();
        match parser.set_language(&grammar) {
            Ok(()) => {
                self.failures.remove(&language);
                self.grammars.insert(language, grammar);
            }
            Err(e) => {
                log::warn!("Grammar for {language} failed to load, using fallback chunking: {e}");
                self.grammars.remove(&language);
                self.failures.insert(language, e.to_string());
            }
        }
    }

    /// Record a language as unavailable
    pub fn mark_unavailable(&mut self, language: Language, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Grammar for {language} marked unavailable: {reason}");
        self.grammars.remove(&language);
        self.failures.insert(language, reason);
    }

    /// Fresh parser bound to the language's grammar.
    ///
    /// Parsers are not shared: each caller owns the returned instance.
    pub fn get_parser(&self, language: Language) -> Option<Parser> {
        let grammar = self.grammars.get(&language)?;
        let mut parser = Parser::new();
        parser.set_language(grammar).ok()?;
        Some(parser)
    }

    pub fn is_language_loaded(&self, language: Language) -> bool {
        self.grammars.contains_key(&language)
    }

    /// Error unless the language has a working grammar
    pub fn require(&self, language: Language) -> Result<()> {
        if self.is_language_loaded(language) {
            return Ok(());
        }
        let reason = self
            .failures
            .get(&language)
            .cloned()
            .unwrap_or_else(|| "not requested at startup".to_string());
        Err(ChunkerError::grammar_unavailable(language.as_str(), reason))
    }

    /// Whether the extension resolves to a language with a working grammar
    pub fn is_loaded(&self, extension: &str) -> bool {
        Language::from_extension(extension).is_some_and(|language| self.is_language_loaded(language))
    }

    /// Load status of every known extension
    pub fn status(&self) -> BTreeMap<String, bool> {
        Language::all_extensions()
            .map(|ext| (ext.to_string(), self.is_loaded(ext)))
            .collect()
    }

    /// Languages with a working grammar
    pub fn loaded_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.grammars.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Human-readable reason why an extension has no AST support
    pub fn error_message(&self, extension: &str) -> Option<String> {
        let ext = extension.trim_start_matches('.');
        let Some(language) = Language::from_extension(ext) else {
            return Some(format!(
                "No grammar is known for extension '.{ext}'; files are split with the fallback chunker"
            ));
        };

        if self.is_language_loaded(language) {
            return None;
        }

        Some(match self.failures.get(&language) {
            Some(reason) => format!("Grammar for {language} failed to load: {reason}"),
            None => format!("Grammar for {language} was not requested at startup"),
        })
    }
}

impl std::fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("loaded", &self.loaded_languages())
            .field("failures", &self.failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_known_grammars_load() {
        let registry = GrammarRegistry::new();
        for language in Language::ALL {
            assert!(
                registry.is_language_loaded(language),
                "{language} should load: {:?}",
                registry.error_message(language.extensions()[0])
            );
        }
    }

    #[test]
    fn test_extension_lookup() {
        let registry = GrammarRegistry::with_languages([Language::Python]);
        assert!(registry.is_loaded("py"));
        assert!(registry.is_loaded(".py"));
        assert!(!registry.is_loaded("rs"));
        assert!(!registry.is_loaded("zig"));
    }

    #[test]
    fn test_status_covers_every_extension() {
        let registry = GrammarRegistry::with_languages([Language::Rust]);
        let status = registry.status();
        assert_eq!(status.get("rs"), Some(&true));
        assert_eq!(status.get("py"), Some(&false));
        assert_eq!(status.len(), Language::all_extensions().count());
    }

    #[test]
    fn test_error_messages() {
        let mut registry = GrammarRegistry::with_languages([Language::Python]);
        assert!(registry.error_message("py").is_none());
        assert!(registry
            .error_message("go")
            .is_some_and(|msg| msg.contains("not requested")));
        assert!(registry
            .error_message("zig")
            .is_some_and(|msg| msg.contains(".zig")));

        registry.mark_unavailable(Language::Python, "abi mismatch");
        assert!(!registry.is_loaded("py"));
        assert!(matches!(
            registry.require(Language::Python),
            Err(ChunkerError::GrammarUnavailable { .. })
        ));
        assert!(registry
            .error_message("py")
            .is_some_and(|msg| msg.contains("abi mismatch")));
    }

    #[test]
    fn test_parsers_are_independent() {
        let registry = GrammarRegistry::new();
        let mut a = registry.get_parser(Language::Python).unwrap();
        let mut b = registry.get_parser(Language::Python).unwrap();
        assert!(a.parse("x = 1\n", None).is_some());
        assert!(b.parse("def f():\n    pass\n", None).is_some());
        assert!(GrammarRegistry::empty().get_parser(Language::Python).is_none());
    }
}
