//! CLI integration tests, none of them reach the browser
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("clean_pdf")
}

const ARTICLE_URL: &str = "https://xie.infoq.cn/article/6bc7a1ab4b1bf6e2d8b0bd5d1";

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--source"))
        .stdout(predicate::str::contains("--output_dir"))
        .stdout(predicate::str::contains("--user_agent"));
}

#[test]
fn test_cli_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_missing_source() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args(["-o", tmp.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Option \"source\" required"))
        .stderr(predicate::str::contains("BrowserError").not());
}

#[test]
fn test_cli_invalid_source() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args(["-s", "xie.infoq.cn/article/1", "-o", tmp.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("has to be url"));
}

#[test]
fn test_cli_output_dir_missing() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing");
    cmd()
        .args(["-s", ARTICLE_URL, "--output_dir", missing.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Output has to be a directory!"));
}

#[test]
fn test_cli_output_dir_is_a_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("notes.txt");
    std::fs::write(&file, "not a directory").unwrap();
    cmd()
        .args(["-s", ARTICLE_URL, "-o", file.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Output has to be a directory!"));
}

#[test]
fn test_cli_no_output_dir_without_downloads_folder() {
    // Outside macOS there is no default at all, on macOS ~/Downloads does not exist here
    let home = TempDir::new().unwrap();
    cmd()
        .env("HOME", home.path())
        .args(["-s", ARTICLE_URL])
        .assert()
        .code(1);
}

#[cfg(not(target_os = "macos"))]
#[test]
fn test_cli_output_dir_required() {
    cmd()
        .args(["-s", ARTICLE_URL])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Option \"output dir\" required"));
}
