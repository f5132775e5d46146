use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "SEMANTIC_CHUNKER_CONFIG";

pub const MIN_CHUNK_SIZE: usize = 100;
pub const MAX_CHUNK_SIZE: usize = 8000;
pub const MAX_CHUNK_OVERLAP: usize = 1000;

/// Per-extension chunking policy. Sizes are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingStrategyConfig {
    /// Upper bound on chunk length (100..=8000)
    pub max_chunk_size: usize,

    /// Characters repeated at the start of the next chunk (0..=1000)
    pub chunk_overlap: usize,

    /// Never split a function or method, even when it exceeds the budget
    pub preserve_methods: bool,

    /// Never split a class-like unit, even when it exceeds the budget
    pub preserve_classes: bool,

    /// Keep the leading import block with the first definition
    pub include_imports: bool,

    /// Keep comments and docstrings with the definition they precede
    pub include_docstrings: bool,

    /// Prefer statement lines at the body's indentation when splitting
    pub respect_indentation: bool,
}

impl Default for ChunkingStrategyConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1500,
            chunk_overlap: 150,
            preserve_methods: true,
            preserve_classes: true,
            include_imports: true,
            include_docstrings: true,
            respect_indentation: true,
        }
    }
}

impl ChunkingStrategyConfig {
    /// Policy for source code with the given budget
    pub fn code(max_chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            max_chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    /// Policy for prose/markup documents
    pub fn markup(max_chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            max_chunk_size,
            chunk_overlap,
            preserve_methods: false,
            preserve_classes: false,
            include_imports: false,
            include_docstrings: true,
            respect_indentation: false,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.max_chunk_size) {
            return Err(format!(
                "max_chunk_size ({}) must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}",
                self.max_chunk_size
            ));
        }

        if self.chunk_overlap > MAX_CHUNK_OVERLAP {
            return Err(format!(
                "chunk_overlap ({}) cannot exceed {MAX_CHUNK_OVERLAP}",
                self.chunk_overlap
            ));
        }

        if self.chunk_overlap >= self.max_chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than max_chunk_size ({})",
                self.chunk_overlap, self.max_chunk_size
            ));
        }

        Ok(())
    }
}

/// Sizes used by the separator-based splitter when no strategy applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl FallbackConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.chunk_size == 0 {
            return Err("fallback chunk_size must be > 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "fallback chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }

        Ok(())
    }

    /// Express the fallback sizes as a strategy (structure flags off)
    #[must_use]
    pub fn as_strategy(&self) -> ChunkingStrategyConfig {
        ChunkingStrategyConfig {
            max_chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            preserve_methods: false,
            preserve_classes: false,
            include_imports: false,
            include_docstrings: false,
            respect_indentation: false,
        }
    }
}

/// Engine-wide chunking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Master switch; when off every document uses the fallback splitter
    pub enabled: bool,

    /// When off, grammars are ignored but per-extension sizes still apply
    pub use_ast_parsing: bool,

    /// Documents larger than this are skipped
    pub max_file_size_mb: f64,

    /// Strategy per extension (lowercase, no dot)
    pub strategies: BTreeMap<String, ChunkingStrategyConfig>,

    pub fallback: FallbackConfig,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            use_ast_parsing: true,
            max_file_size_mb: 10.0,
            strategies: default_strategies(),
            fallback: FallbackConfig::default(),
        }
    }
}

fn default_strategies() -> BTreeMap<String, ChunkingStrategyConfig> {
    let mut strategies = BTreeMap::new();

    strategies.insert("py".to_string(), ChunkingStrategyConfig::code(2000, 200));
    strategies.insert("pyw".to_string(), ChunkingStrategyConfig::code(2000, 200));

    for ext in ["js", "jsx", "mjs", "cjs", "ts", "tsx"] {
        strategies.insert(ext.to_string(), ChunkingStrategyConfig::code(1500, 150));
    }

    for ext in ["rs", "go"] {
        strategies.insert(ext.to_string(), ChunkingStrategyConfig::code(2000, 200));
    }

    // Verbose languages get a larger budget so whole classes fit more often.
    for ext in ["java", "cs"] {
        strategies.insert(ext.to_string(), ChunkingStrategyConfig::code(2500, 250));
    }

    for ext in ["md", "markdown"] {
        strategies.insert(ext.to_string(), ChunkingStrategyConfig::markup(1500, 100));
    }

    strategies
}

/// On-disk shape: every key optional so missing keys keep their defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    enabled: Option<bool>,
    use_ast_parsing: Option<bool>,
    max_file_size_mb: Option<f64>,
    strategies: BTreeMap<String, ChunkingStrategyConfig>,
    fallback: Option<FallbackConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn decode(self, text: &str) -> std::result::Result<ConfigFile, String> {
        match self {
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => {
                if text.trim().is_empty() {
                    return Ok(ConfigFile::default());
                }
                serde_yaml::from_str(text).map_err(|e| e.to_string())
            }
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

impl ChunkingConfig {
    /// Strategy for an extension (with or without the dot)
    pub fn get_strategy_config(&self, extension: &str) -> Option<&ChunkingStrategyConfig> {
        self.strategies.get(&normalize_extension(extension))
    }

    pub const fn get_fallback_config(&self) -> &FallbackConfig {
        &self.fallback
    }

    /// Size limit in bytes
    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb * 1024.0 * 1024.0) as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.max_file_size_mb.is_finite() && self.max_file_size_mb > 0.0) {
            return Err(format!(
                "max_file_size_mb ({}) must be > 0",
                self.max_file_size_mb
            ));
        }

        for (ext, strategy) in &self.strategies {
            strategy
                .validate()
                .map_err(|e| format!("strategy '{ext}': {e}"))?;
        }

        self.fallback.validate()
    }

    /// Load a TOML, YAML or JSON file over the built-in defaults.
    ///
    /// Strategy entries from the file replace the default entry for their
    /// extension wholesale; fields missing inside an entry take the struct
    /// defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ChunkerError::ConfigFormat {
            path: path.display().to_string(),
            message: "expected a .toml, .yaml, .yml or .json file".to_string(),
        })?;

        let text = std::fs::read_to_string(path)?;
        let file = format
            .decode(&text)
            .map_err(|message| ChunkerError::ConfigFormat {
                path: path.display().to_string(),
                message,
            })?;

        let config = Self::default().overlay(file);
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(config)
    }

    fn overlay(mut self, file: ConfigFile) -> Self {
        if let Some(enabled) = file.enabled {
            self.enabled = enabled;
        }
        if let Some(use_ast_parsing) = file.use_ast_parsing {
            self.use_ast_parsing = use_ast_parsing;
        }
        if let Some(max_file_size_mb) = file.max_file_size_mb {
            self.max_file_size_mb = max_file_size_mb;
        }
        if let Some(fallback) = file.fallback {
            self.fallback = fallback;
        }
        for (ext, strategy) in file.strategies {
            self.strategies.insert(normalize_extension(&ext), strategy);
        }
        self
    }

    /// Snapshot of the whole configuration as JSON
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Owns the active configuration and where it came from
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config: ChunkingConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Manager holding the built-in defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkingConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self {
            config,
            source: None,
        })
    }

    /// Load a file, keeping the defaults if it cannot be used
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let mut manager = Self::new();
        if let Err(e) = manager.load_from_file(path.as_ref()) {
            log::warn!(
                "Ignoring chunking config {}: {e}; using built-in defaults",
                path.as_ref().display()
            );
        }
        manager
    }

    /// Defaults, or the file named by `SEMANTIC_CHUNKER_CONFIG` when set
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load_or_default(PathBuf::from(path)),
            _ => Self::new(),
        }
    }

    /// Replace the active configuration from a file.
    ///
    /// On error the current configuration is left untouched.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.config = ChunkingConfig::load_from_file(path)?;
        self.source = Some(path.to_path_buf());
        log::debug!("Loaded chunking config from {}", path.display());
        Ok(())
    }

    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn into_config(self) -> ChunkingConfig {
        self.config
    }

    /// File the active configuration was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get_strategy_config(&self, extension: &str) -> Option<&ChunkingStrategyConfig> {
        self.config.get_strategy_config(extension)
    }

    pub const fn get_fallback_config(&self) -> &FallbackConfig {
        self.config.get_fallback_config()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.config.validate()
    }

    pub fn to_dict(&self) -> serde_json::Value {
        self.config.to_dict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ChunkingConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.enabled);
        assert!(config.use_ast_parsing);
        assert_eq!(config.max_file_size_mb, 10.0);
        assert_eq!(config.get_fallback_config().chunk_size, 1000);
        assert_eq!(config.get_fallback_config().chunk_overlap, 200);
    }

    #[test]
    fn test_default_strategy_table() {
        let config = ChunkingConfig::default();
        let py = config.get_strategy_config(".py").unwrap();
        assert_eq!((py.max_chunk_size, py.chunk_overlap), (2000, 200));
        assert!(py.preserve_methods && py.include_docstrings);

        let tsx = config.get_strategy_config("TSX").unwrap();
        assert_eq!(tsx.max_chunk_size, 1500);

        let md = config.get_strategy_config("md").unwrap();
        assert!(!md.preserve_classes);
        assert!(!md.respect_indentation);

        assert!(config.get_strategy_config("zig").is_none());
    }

    #[test]
    fn test_strategy_validation() {
        assert!(ChunkingStrategyConfig::code(99, 0).validate().is_err());
        assert!(ChunkingStrategyConfig::code(8001, 0).validate().is_err());
        assert!(ChunkingStrategyConfig::code(2000, 1001).validate().is_err());
        assert!(ChunkingStrategyConfig::code(500, 500).validate().is_err());
        assert!(ChunkingStrategyConfig::code(100, 99).validate().is_ok());
        assert!(ChunkingStrategyConfig::code(8000, 1000).validate().is_ok());
    }

    #[test]
    fn test_fallback_validation() {
        let zero = FallbackConfig {
            chunk_size: 0,
            chunk_overlap: 0,
        };
        assert!(zero.validate().is_err());

        let overlap = FallbackConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(overlap.validate().is_err());
    }

    #[test]
    fn test_toml_overlays_defaults() {
        let file = write_config(
            ".toml",
            r#"
use_ast_parsing = false
some_future_key = "ignored"

[strategies.py]
max_chunk_size = 800
chunk_overlap = 50

[fallback]
chunk_size = 600
"#,
        );

        let config = ChunkingConfig::load_from_file(file.path()).unwrap();
        assert!(config.enabled);
        assert!(!config.use_ast_parsing);

        let py = config.get_strategy_config("py").unwrap();
        assert_eq!(py.max_chunk_size, 800);
        assert_eq!(py.chunk_overlap, 50);
        assert!(py.preserve_methods);

        assert_eq!(config.get_strategy_config("rs").unwrap().max_chunk_size, 2000);
        assert_eq!(config.fallback.chunk_size, 600);
        assert_eq!(config.fallback.chunk_overlap, 200);
    }

    #[test]
    fn test_yaml_and_json_formats() {
        let yaml = write_config(
            ".yaml",
            "max_file_size_mb: 2.5\nstrategies:\n  .RS:\n    max_chunk_size: 1200\n",
        );
        let config = ChunkingConfig::load_from_file(yaml.path()).unwrap();
        assert_eq!(config.max_file_size_mb, 2.5);
        assert_eq!(config.get_strategy_config("rs").unwrap().max_chunk_size, 1200);

        let json = write_config(".json", r#"{"enabled": false}"#);
        let config = ChunkingConfig::load_from_file(json.path()).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.strategies, ChunkingConfig::default().strategies);
    }

    #[test]
    fn test_invalid_files_are_rejected() {
        let bad_value = write_config(".toml", "[strategies.py]\nmax_chunk_size = 50\n");
        assert!(matches!(
            ChunkingConfig::load_from_file(bad_value.path()),
            Err(ChunkerError::InvalidConfig(_))
        ));

        let bad_syntax = write_config(".json", "{ not json");
        assert!(matches!(
            ChunkingConfig::load_from_file(bad_syntax.path()),
            Err(ChunkerError::ConfigFormat { .. })
        ));

        let bad_ext = write_config(".ini", "enabled = true");
        assert!(matches!(
            ChunkingConfig::load_from_file(bad_ext.path()),
            Err(ChunkerError::ConfigFormat { .. })
        ));
    }

    #[test]
    fn test_manager_keeps_defaults_on_failure() {
        let bad = write_config(".toml", "max_file_size_mb = 0\n");
        let manager = ConfigManager::load_or_default(bad.path());
        assert_eq!(manager.config(), &ChunkingConfig::default());
        assert!(manager.source().is_none());

        let missing = ConfigManager::load_or_default("/nonexistent/chunking.toml");
        assert_eq!(missing.config(), &ChunkingConfig::default());
    }

    #[test]
    fn test_manager_load_and_dict() {
        let good = write_config(".toml", "[fallback]\nchunk_size = 400\nchunk_overlap = 40\n");
        let mut manager = ConfigManager::new();
        manager.load_from_file(good.path()).unwrap();
        assert_eq!(manager.get_fallback_config().chunk_size, 400);
        assert_eq!(manager.source(), Some(good.path()));

        let dict = manager.to_dict();
        assert_eq!(dict["fallback"]["chunk_overlap"], 40);
        assert_eq!(dict["strategies"]["py"]["max_chunk_size"], 2000);
        assert_eq!(dict["enabled"], true);
    }
}
