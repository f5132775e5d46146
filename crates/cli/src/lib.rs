use anyhow::{bail, Context as AnyhowContext, Result};
use clap::Parser;
use semantic_chunker::{
    BatchOutcome, ChunkingFactory, ChunkingStats, ConfigManager, Document, GrammarRegistry,
    Language,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "context-chunk")]
#[command(about = "Split source files into structure-aware chunks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Files or directories to chunk
    pub paths: Vec<PathBuf>,

    /// Chunking config file (.toml, .yaml or .json); overrides SEMANTIC_CHUNKER_CONFIG
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print grammar status, registered chunkers and the active config, then exit
    #[arg(long)]
    pub status: bool,

    /// Print a statistics summary instead of chunks
    #[arg(long)]
    pub stats: bool,

    /// Chunk files on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Fail unless the grammar for this language loaded (repeatable)
    #[arg(long = "require-grammar", value_name = "LANG")]
    pub require_grammars: Vec<Language>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Serialize)]
struct StatusReport {
    grammars: BTreeMap<String, bool>,
    errors: BTreeMap<String, String>,
    chunkers: BTreeMap<String, Vec<String>>,
    config: serde_json::Value,
    config_source: Option<String>,
}

#[derive(Serialize)]
struct StatsReport {
    files: usize,
    skipped: usize,
    chunks: usize,
    total_lines: usize,
    total_tokens: usize,
    avg_tokens_per_chunk: usize,
    min_tokens: usize,
    max_tokens: usize,
    oversized_chunks: usize,
    fallback_chunks: usize,
    summary: String,
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    run(&cli)
}

pub fn run(cli: &Cli) -> Result<()> {
    let manager = load_config(cli.config.as_deref())?;
    let grammars = Arc::new(GrammarRegistry::new());
    for language in &cli.require_grammars {
        grammars
            .require(*language)
            .with_context(|| format!("required grammar {language} is unavailable"))?;
    }

    let config_source = manager.source().map(|p| p.display().to_string());
    let factory = ChunkingFactory::with_default_chunkers(manager.into_config(), grammars);

    if cli.status {
        return print_status(&factory, config_source);
    }

    if cli.paths.is_empty() {
        bail!("no input paths given (use --status to inspect the engine)");
    }

    let documents = collect_documents(&cli.paths)?;
    log::info!("Chunking {} file(s)", documents.len());

    let outcome = if cli.parallel {
        factory.chunk_documents_parallel(&documents)
    } else {
        factory.chunk_documents_with_report(&documents)
    };

    if cli.stats {
        print_stats(documents.len(), &outcome)
    } else {
        for chunk in &outcome.chunks {
            print_stdout(&serde_json::to_string(chunk)?)?;
        }
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigManager> {
    match path {
        Some(path) => {
            let mut manager = ConfigManager::new();
            manager
                .load_from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            Ok(manager)
        }
        None => Ok(ConfigManager::from_env()),
    }
}

fn print_status(factory: &ChunkingFactory, config_source: Option<String>) -> Result<()> {
    let grammars = factory.grammar_status();
    let errors = grammars
        .keys()
        .filter_map(|ext| {
            factory
                .get_language_error_message(ext)
                .map(|msg| (ext.clone(), msg))
        })
        .collect();

    let report = StatusReport {
        grammars,
        errors,
        chunkers: factory.chunker_info(),
        config: factory.config().to_dict(),
        config_source,
    };
    print_stdout(&serde_json::to_string_pretty(&report)?)
}

fn print_stats(files: usize, outcome: &BatchOutcome) -> Result<()> {
    let stats = ChunkingStats::from_chunks(&outcome.chunks);
    let report = StatsReport {
        files,
        skipped: outcome.skipped.len(),
        chunks: stats.total_chunks,
        total_lines: stats.total_lines,
        total_tokens: stats.total_tokens,
        avg_tokens_per_chunk: stats.avg_tokens_per_chunk,
        min_tokens: stats.min_tokens,
        max_tokens: stats.max_tokens,
        oversized_chunks: stats.oversized_chunks,
        fallback_chunks: stats.fallback_chunks,
        summary: stats.to_string(),
    };
    print_stdout(&serde_json::to_string_pretty(&report)?)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Read every UTF-8 file under the given paths, in a stable order
fn collect_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for root in paths {
        if !root.exists() {
            bail!("path does not exist: {}", root.display());
        }

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            match fs::read_to_string(path) {
                Ok(content) => documents.push(Document::new(content, path.display().to_string())),
                Err(err) => log::debug!("Skipping unreadable file {}: {err}", path.display()),
            }
        }
    }
    Ok(documents)
}
