use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn cli() -> Command {
    let mut cmd = Command::cargo_bin("context-chunk").expect("binary");
    cmd.env_remove("SEMANTIC_CHUNKER_CONFIG").arg("--quiet");
    cmd
}

fn setup_repo() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("src/lib.rs"),
        r#"/// Greets someone.
pub fn greet(name: &str) {
    println!("hi {name}");
}

pub fn hello() {
    greet("world");
}
"#,
    )
    .unwrap();
    fs::write(root.join("notes.txt"), "plain notes\nwith two lines\n").unwrap();
    temp
}

#[test]
fn chunks_are_printed_as_json_lines() {
    let temp = setup_repo();
    let output = cli().arg(temp.path()).output().expect("command run");
    assert!(output.status.success());

    let chunks: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json"))
        .collect();
    assert_eq!(chunks.len(), 2);

    let rust = chunks
        .iter()
        .find(|c| c["metadata"]["file_path"].as_str().unwrap().ends_with("lib.rs"))
        .expect("rust chunk");
    assert_eq!(rust["metadata"]["chunker"], "rust_chunker");
    assert_eq!(rust["metadata"]["contains_documentation"], true);

    let notes = chunks
        .iter()
        .find(|c| c["metadata"]["file_path"].as_str().unwrap().ends_with("notes.txt"))
        .expect("notes chunk");
    assert_eq!(notes["metadata"]["chunk_type"], "fallback");
}

#[test]
fn stats_summary_counts_files() {
    let temp = setup_repo();
    let output = cli()
        .arg("--stats")
        .arg("--parallel")
        .arg(temp.path())
        .output()
        .expect("command run");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["files"], 2);
    assert_eq!(report["skipped"], 0);
    assert_eq!(report["chunks"], 2);
    assert_eq!(report["fallback_chunks"], 1);
}

#[test]
fn status_reports_grammars_and_config() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("chunking.toml");
    fs::write(&config, "[fallback]\nchunk_size = 500\nchunk_overlap = 50\n").unwrap();

    let output = cli()
        .arg("--status")
        .arg("--config")
        .arg(&config)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["grammars"]["py"], true);
    assert_eq!(report["chunkers"]["markdown_chunker"][0], "markdown");
    assert_eq!(report["config"]["fallback"]["chunk_size"], 500);
    assert!(report["config_source"].as_str().unwrap().ends_with("chunking.toml"));
}

#[test]
fn invalid_config_file_fails() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("chunking.yaml");
    fs::write(&config, "strategies:\n  py:\n    max_chunk_size: 10\n").unwrap();

    cli()
        .arg("--status")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("failed to load config"));
}

#[test]
fn missing_paths_fail() {
    cli().assert().failure().stderr(contains("no input paths"));
}
