//! Tests for the `dbfacade` binary: fatal failures end the process, query
//! failures do not.

use assert_cmd::Command;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_host() -> TempDir {
    let dir = TempDir::new().unwrap();
    let conn = Connection::open(dir.path().join("volga.db")).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
        INSERT INTO t (id, name) VALUES (1, 'lamp'), (5, 'chair');
    ",
    )
    .unwrap();
    dir
}

fn write_config(dir: &Path, host: &str, dbname: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "host = \"{}\"\nusername = \"root\"\npasswd = \"passwd\"\ndbname = \"{}\"\n",
            host, dbname
        ),
    )
    .unwrap();
    path
}

fn dbfacade() -> Command {
    let mut cmd = Command::cargo_bin("dbfacade").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn runs_statements_and_reports_counts() {
    let host = create_host();
    let config = write_config(host.path(), &host.path().to_string_lossy(), "volga");

    let assert = dbfacade()
        .arg("--config")
        .arg(&config)
        .arg("SELECT id, name FROM t WHERE id = 1")
        .arg("UPDATE t SET name = 'stool' WHERE id = 5")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("1 row(s) returned"), "stdout: {}", stdout);
    assert!(stdout.contains(r#"{"id":"1","name":"lamp"}"#), "stdout: {}", stdout);
    assert!(stdout.contains("1 row(s) affected"), "stdout: {}", stdout);
}

#[test]
fn unknown_host_terminates_with_connection_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "/nonexistent/dbfacade", "volga");

    let assert = dbfacade().arg("--config").arg(&config).assert().code(1);

    let stderr = stderr_of(assert.get_output());
    assert!(stderr.contains("Connection error (14)"), "stderr: {}", stderr);
}

#[test]
fn unknown_database_terminates_with_not_found_message() {
    let host = create_host();
    let config = write_config(host.path(), &host.path().to_string_lossy(), "volga");

    let assert = dbfacade()
        .arg("--config")
        .arg(&config)
        .arg("--database")
        .arg("does_not_exist")
        .arg("SELECT 1")
        .assert()
        .code(1);

    let output = assert.get_output();
    let stderr = stderr_of(output);
    assert!(stderr.contains("Database not found"), "stderr: {}", stderr);
    assert!(stderr.contains("does_not_exist"), "stderr: {}", stderr);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("row(s)"));
}

#[test]
fn failed_statement_is_reported_but_not_fatal() {
    let host = create_host();
    let config = write_config(host.path(), &host.path().to_string_lossy(), "volga");

    let assert = dbfacade()
        .arg("--config")
        .arg(&config)
        .arg("DELETE FROM missing")
        .arg("SELECT COUNT(*) FROM t")
        .assert()
        .success();

    let output = assert.get_output();
    assert!(stderr_of(output).contains("Query failed"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 row(s) returned"));
}

#[test]
fn multiple_statements_in_one_argument_are_refused() {
    let host = create_host();
    let config = write_config(host.path(), &host.path().to_string_lossy(), "volga");

    let assert = dbfacade()
        .arg("--config")
        .arg(&config)
        .arg("DELETE FROM t WHERE id = 1; DELETE FROM t WHERE id = 5")
        .arg("SELECT COUNT(*) FROM t")
        .assert()
        .success();

    let output = assert.get_output();
    assert!(stderr_of(output).contains("one statement"), "stderr: {}", stderr_of(output));
    assert!(String::from_utf8_lossy(&output.stdout).contains(r#"{"COUNT(*)":"2"}"#));
}

#[test]
fn missing_config_file_is_fatal() {
    let dir = TempDir::new().unwrap();

    let assert = dbfacade()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .assert()
        .code(1);

    assert!(stderr_of(assert.get_output()).contains("Configuration error"));
}

#[test]
fn help_prints_usage() {
    let assert = dbfacade().arg("--help").assert().success();
    assert!(String::from_utf8_lossy(&assert.get_output().stdout).contains("Usage: dbfacade"));
}
