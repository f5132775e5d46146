use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while configuring or running the chunking engine
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// No working grammar is bound for the language
    #[error("Grammar unavailable for {language}: {reason}")]
    GrammarUnavailable { language: String, reason: String },

    /// The parser could not produce a tree for this document
    #[error(transparent)]
    ParseUnavailable(#[from] ParseUnavailable),

    /// Unsupported language or extension
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be decoded
    #[error("Invalid configuration format in {path}: {message}")]
    ConfigFormat { path: String, message: String },

    /// Document exceeds the configured maximum file size
    #[error("Document {file_path} is too large: {size} bytes (limit {limit} bytes)")]
    DocumentTooLarge {
        file_path: String,
        size: usize,
        limit: usize,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChunkerError {
    /// Create a grammar-unavailable error
    pub fn grammar_unavailable(language: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GrammarUnavailable {
            language: language.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error only affects one document and the batch should go on
    #[must_use]
    pub const fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Self::ParseUnavailable(_) | Self::DocumentTooLarge { .. } | Self::UnsupportedLanguage(_)
        )
    }
}

/// A parser could not be used for a specific document.
///
/// Returned by the analyzer instead of raising; chunkers branch on it and
/// route the document to the fallback splitter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Parse unavailable for {language}: {reason}")]
pub struct ParseUnavailable {
    pub language: String,
    pub reason: String,
}

impl ParseUnavailable {
    pub fn new(language: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_scoped_errors() {
        let too_large = ChunkerError::DocumentTooLarge {
            file_path: "big.py".to_string(),
            size: 20,
            limit: 10,
        };
        assert!(too_large.is_document_scoped());
        assert!(ChunkerError::from(ParseUnavailable::new("rust", "no tree")).is_document_scoped());
        assert!(!ChunkerError::invalid_config("bad").is_document_scoped());
        assert!(!ChunkerError::grammar_unavailable("go", "abi").is_document_scoped());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = ChunkerError::from(ParseUnavailable::new("python", "grammar not loaded"));
        assert_eq!(err.to_string(), "Parse unavailable for python: grammar not loaded");
        assert!(ChunkerError::unsupported_language("cobol")
            .to_string()
            .contains("cobol"));
    }
}
