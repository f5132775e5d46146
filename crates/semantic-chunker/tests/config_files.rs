use pretty_assertions::assert_eq;
use semantic_chunker::{
    ChunkType, ChunkerError, ChunkingConfig, ChunkingFactory, ConfigManager, Document,
    GrammarRegistry,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn config_file(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("chunking")
        .suffix(suffix)
        .tempfile()
        .unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn toml_strategy_drives_the_factory() {
    let file = config_file(
        ".toml",
        r#"
[strategies.py]
max_chunk_size = 1000
chunk_overlap = 0
preserve_methods = false
"#,
    );
    let config = ChunkingConfig::load_from_file(file.path()).unwrap();
    let factory = ChunkingFactory::with_default_chunkers(config, Arc::new(GrammarRegistry::new()));

    let strategy = factory.strategy_for("job.py");
    assert_eq!(strategy.max_chunk_size, 1000);
    assert!(!strategy.preserve_methods);
    // Unspecified fields inside an entry take the struct defaults.
    assert!(strategy.include_docstrings);

    let body: String = (0..100).map(|i| format!("    step_{i:02} = {i:02}\n")).collect();
    let source = format!("def job():\n{body}");
    let chunks = factory
        .chunk_document(&Document::new(source, "job.py"))
        .unwrap();
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.metadata.chunk_size <= 1000));
    assert!(chunks
        .iter()
        .all(|c| c.metadata.chunk_type == ChunkType::Function));

    // Other extensions keep their built-in strategy.
    assert_eq!(factory.strategy_for("lib.rs").max_chunk_size, 2000);
}

#[test]
fn yaml_and_json_are_equivalent() {
    let yaml = config_file(
        ".yml",
        "enabled: true\nmax_file_size_mb: 0.5\nfallback:\n  chunk_size: 400\n  chunk_overlap: 40\nstrategies:\n  .TS:\n    max_chunk_size: 900\n    chunk_overlap: 90\n",
    );
    let json = config_file(
        ".json",
        r#"{
  "enabled": true,
  "max_file_size_mb": 0.5,
  "fallback": {"chunk_size": 400, "chunk_overlap": 40},
  "strategies": {".TS": {"max_chunk_size": 900, "chunk_overlap": 90}}
}"#,
    );

    let from_yaml = ChunkingConfig::load_from_file(yaml.path()).unwrap();
    let from_json = ChunkingConfig::load_from_file(json.path()).unwrap();
    assert_eq!(from_yaml, from_json);
    assert_eq!(from_yaml.get_strategy_config("ts").unwrap().max_chunk_size, 900);
    assert_eq!(from_yaml.fallback.chunk_size, 400);
    assert_eq!(from_yaml.max_file_size_bytes(), 512 * 1024);
}

#[test]
fn oversized_documents_are_skipped_in_batches() {
    let file = config_file(".toml", "max_file_size_mb = 0.001\n");
    let config = ChunkingConfig::load_from_file(file.path()).unwrap();
    let factory = ChunkingFactory::with_default_chunkers(config, Arc::new(GrammarRegistry::new()));

    let big = Document::new("x = 1\n".repeat(400), "big.py");
    let small = Document::new("x = 1\n", "small.py");
    assert!(matches!(
        factory.chunk_document(&big),
        Err(ChunkerError::DocumentTooLarge { .. })
    ));

    let outcome = factory.chunk_documents_with_report(&[big, small]);
    assert_eq!(outcome.chunks.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].file_path, "big.py");
}

#[test]
fn invalid_files_are_rejected_and_manager_keeps_defaults() {
    let bad_size = config_file(".toml", "[strategies.go]\nmax_chunk_size = 50\n");
    assert!(matches!(
        ChunkingConfig::load_from_file(bad_size.path()),
        Err(ChunkerError::InvalidConfig(_))
    ));

    let bad_syntax = config_file(".json", "{ not json");
    assert!(matches!(
        ChunkingConfig::load_from_file(bad_syntax.path()),
        Err(ChunkerError::ConfigFormat { .. })
    ));

    let mut manager = ConfigManager::new();
    assert!(manager.load_from_file(bad_size.path()).is_err());
    assert_eq!(manager.config(), &ChunkingConfig::default());
    assert_eq!(manager.source(), None);

    let fallback = ConfigManager::load_or_default(bad_syntax.path());
    assert_eq!(fallback.config(), &ChunkingConfig::default());
}

#[test]
fn disabled_engine_routes_everything_to_fallback() {
    let file = config_file(".yaml", "enabled: false\n");
    let mut manager = ConfigManager::new();
    manager.load_from_file(file.path()).unwrap();
    assert_eq!(manager.source(), Some(file.path()));

    let factory =
        ChunkingFactory::with_default_chunkers(manager.into_config(), Arc::new(GrammarRegistry::new()));
    let chunks = factory
        .chunk_document(&Document::new("fn main() {}\n", "main.rs"))
        .unwrap();
    assert_eq!(chunks[0].metadata.chunker, "fallback");
    assert_eq!(factory.strategy_for("main.rs").max_chunk_size, 1000);
}
