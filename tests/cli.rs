//! Command-line tests: run the `wikidump` binary against the fixture dump.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture_dump() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-dump.xml")
}

fn wikidump(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wikidump"))
        .args(args)
        .arg("--config-dir")
        .arg(config_dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run wikidump")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "wikidump failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn convert_to_html() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("site");
    let dump = fixture_dump();
    let output = wikidump(
        &["convert", "--dump", dump.to_str().unwrap(), "--out", out.to_str().unwrap(), "--manifest"],
        tmp.path(),
    );
    assert_success(&output);

    let text = stdout(&output);
    assert!(text.starts_with("==> Converting "));
    assert!(text.contains("001 Main Page \u{2192} main-page.html"));
    assert!(text.contains("    Redirect: Robin"));
    assert!(text.contains("001 Birds (3 pages) \u{2192} category-birds.html"));
    assert!(text.contains("Generated 4 pages, 3 categories, 0 revision documents"));
    assert!(text.contains("Manifest: "));
    assert!(out.join("index.html").exists());
    assert!(out.join("manifest.json").exists());
}

#[test]
fn convert_to_markdown_with_old_revisions() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("md");
    let dump = fixture_dump();
    let output = wikidump(
        &[
            "convert",
            "--dump",
            dump.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--format",
            "markdown",
            "--dump-old-revisions",
        ],
        tmp.path(),
    );
    assert_success(&output);
    assert!(stdout(&output).contains("1 revision document"));
    assert!(out.join("main-page.md").exists());
    assert!(out.join("main-page/41.md").exists());
}

#[test]
fn config_file_selects_format() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("wikidump.toml"), "[output]\nformat = \"markdown\"\n").unwrap();
    let out = tmp.path().join("site");
    let dump = fixture_dump();
    let output = wikidump(
        &["convert", "--dump", dump.to_str().unwrap(), "--out", out.to_str().unwrap()],
        tmp.path(),
    );
    assert_success(&output);
    assert!(out.join("index.md").exists());
    assert!(!out.join("index.html").exists());
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("wikidump.toml"), "[output]\nunknown_key = 1\n").unwrap();
    let dump = fixture_dump();
    let output = wikidump(&["check", "--dump", dump.to_str().unwrap()], tmp.path());
    assert!(!output.status.success());
}

#[test]
fn check_lists_pages_without_writing() {
    let tmp = TempDir::new().unwrap();
    let dump = fixture_dump();
    let output = wikidump(&["check", "--dump", dump.to_str().unwrap(), "--limit", "2"], tmp.path());
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("002 Robin \u{2192} robin.html"));
    assert!(!text.contains("Heron \u{2192}"));
    assert!(text.trim_end().ends_with("==> Dump is readable"));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn missing_dump_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.xml");
    let output = wikidump(&["check", "--dump", missing.to_str().unwrap()], tmp.path());
    assert!(!output.status.success());
}

#[test]
fn gen_config_prints_stock_toml() {
    let tmp = TempDir::new().unwrap();
    let output = wikidump(&["gen-config"], tmp.path());
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("[output]"));
    assert!(text.contains("[images]"));
    let parsed: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(parsed["parsing"]["template_passes"].as_integer(), Some(10));
}
