use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn coins_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("coins");
    path
}

fn setup_test_env(numista_extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/coins.sqlite"

[numista]
api_key = "test-key"
{}
"#,
        root.display(),
        numista_extra
    );

    let config_path = config_dir.join("coins.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_coins(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = coins_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run coins binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_coins(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/coins.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, _, success1) = run_coins(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_coins(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_auth_url_default_locale() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_coins(&config_path, &["auth-url"]);
    assert!(success, "auth-url failed: stderr={}", stderr);
    let url = stdout.trim();
    assert!(url.starts_with("https://en.numista.com/api/oauth_authorize.php?"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("client_id=opennumismat"));
    assert!(url.contains("scope=view_collection"));
}

#[test]
fn test_auth_url_french_locale() {
    let (_tmp, config_path) = setup_test_env("locale = \"fr_CA\"");

    let (stdout, _, success) = run_coins(&config_path, &["auth-url"]);
    assert!(success);
    assert!(stdout.trim().starts_with("https://fr.numista.com/"));
}

#[test]
fn test_auth_url_unsupported_locale_uses_english() {
    let (_tmp, config_path) = setup_test_env("locale = \"ja\"");

    let (stdout, _, success) = run_coins(&config_path, &["auth-url"]);
    assert!(success);
    assert!(stdout.trim().starts_with("https://en.numista.com/"));
}

#[test]
fn test_list_empty_database() {
    let (_tmp, config_path) = setup_test_env("");

    run_coins(&config_path, &["init"]);
    let (stdout, stderr, success) = run_coins(&config_path, &["list"]);
    assert!(success, "list failed: stderr={}", stderr);
    assert!(stdout.contains("No coins imported yet."));
}

#[test]
fn test_get_missing_coin_fails() {
    let (_tmp, config_path) = setup_test_env("");

    run_coins(&config_path, &["init"]);
    let (_, stderr, success) = run_coins(&config_path, &["get", "999"]);
    assert!(!success);
    assert!(stderr.contains("coin not found"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env("request_timeout_secs = 0");

    let (_, stderr, success) = run_coins(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("timeouts must be > 0"));
}

#[test]
fn test_import_cancelled_on_empty_input() {
    let (_tmp, config_path) = setup_test_env("");

    run_coins(&config_path, &["init"]);
    // stdin is empty, so the console surface sees end of input
    let (_, stderr, success) = run_coins(&config_path, &["import", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("authorization cancelled"));
    assert!(stderr.contains("oauth_authorize.php"));
}

#[test]
fn test_completions_without_config() {
    let output = Command::new(coins_binary())
        .args(["--config", "/nonexistent/coins.toml", "completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("coins"));
}
