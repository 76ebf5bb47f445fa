//! CLI integration tests
//!
//! Runs the built quill-server binary. Every test uses its own temporary
//! working directory so no `.env` or `quill.toml` from the repo leaks in.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const SECRET_ENV: &str = "QUILL_CLI_TEST_SECRET";
const SECRET: &str = "cli-test-secret-that-is-long-enough-1234";

fn quill(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_quill-server"));
    cmd.current_dir(dir)
        .arg("--no-color")
        .env_remove(SECRET_ENV)
        .env_remove("QUILL_TOKEN_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn quill-server");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for quill-server")
}

/// Minimal config with cheap hashing and a file database inside `dir`.
fn write_config(dir: &Path) {
    let config = format!(
        r#"
[auth]
token_secret_env = "{SECRET_ENV}"

[database]
url = "data/quill.db"

[hashing]
memory_kib = 8
iterations = 1
parallelism = 1
"#
    );
    fs::write(dir.join("quill.toml"), config).expect("Failed to write config");
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = quill(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("gen-secret"));
    assert!(text.contains("create-user"));
    assert!(text.contains("hash-password"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    let output = quill(dir.path()).arg("--version").output().unwrap();

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    let output = quill(dir.path()).arg("frobnicate").output().unwrap();

    assert!(!output.status.success());
}

// =============================================================================
// Offline Commands
// =============================================================================

#[test]
fn test_gen_secret() {
    let dir = TempDir::new().unwrap();
    let output = quill(dir.path())
        .args(["gen-secret", "--bytes", "16"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let secret = stdout(&output).trim().to_string();
    assert_eq!(secret.len(), 32);
    assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_password_from_stdin() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let mut cmd = quill(dir.path());
    cmd.arg("hash-password");
    let output = run_with_stdin(cmd, "hunter2\n");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let hash = stdout(&output).trim().to_string();
    assert!(hash.starts_with("$argon2id$"));
    assert!(hash.contains("m=8,t=1,p=1"));
}

#[test]
fn test_hash_password_rejects_empty_input() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let mut cmd = quill(dir.path());
    cmd.arg("hash-password");
    let output = run_with_stdin(cmd, "\n");

    assert!(!output.status.success());
}

#[test]
fn test_create_user_writes_database() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let mut cmd = quill(dir.path());
    cmd.args([
        "create-user",
        "--email",
        "ana@blog.com",
        "--name",
        "Ana",
        "--role",
        "admin",
    ]);
    let output = run_with_stdin(cmd, "s3cret\n");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("ana@blog.com"));
    assert!(dir.path().join("data/quill.db").is_file());

    // same email again is rejected
    let mut cmd = quill(dir.path());
    cmd.args(["create-user", "--email", "ana@blog.com", "--name", "Ana"]);
    let output = run_with_stdin(cmd, "s3cret\n");
    assert!(!output.status.success());
}

#[test]
fn test_create_user_rejects_unknown_role() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let output = quill(dir.path())
        .args(["create-user", "--email", "x@blog.com", "--name", "X", "--role", "root"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

// =============================================================================
// Config Command
// =============================================================================

#[test]
fn test_config_validate_requires_secret() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let output = quill(dir.path())
        .args(["config", "--validate"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains(SECRET_ENV));
}

#[test]
fn test_config_validate_rejects_short_secret() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let output = quill(dir.path())
        .args(["config", "--validate"])
        .env(SECRET_ENV, "short")
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn test_config_validate_succeeds_with_secret() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let output = quill(dir.path())
        .args(["config", "--validate"])
        .env(SECRET_ENV, SECRET)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Configuration is valid"));
}

#[test]
fn test_config_warns_about_missing_secret() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let output = quill(dir.path()).arg("config").output().unwrap();

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[WARN]"));
    assert!(text.contains(SECRET_ENV));

    let output = quill(dir.path())
        .arg("config")
        .env(SECRET_ENV, SECRET)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!stdout(&output).contains("[WARN]"));
}

#[test]
fn test_config_without_file_fails() {
    let dir = TempDir::new().unwrap();

    let output = quill(dir.path()).arg("config").output().unwrap();

    assert!(!output.status.success());
}

#[test]
fn test_serve_refuses_to_start_without_secret() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let output = quill(dir.path()).arg("serve").output().unwrap();

    assert!(!output.status.success());
    assert!(!dir.path().join("data/quill.db").exists());
}
