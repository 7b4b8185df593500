//! Contract tests for the fsstat binary: help, exit codes, overwrite prompt

use crate::fixtures::create_simple_fixture;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn fsstat() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fsstat"));
    cmd.env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_help() {
    let output = fsstat().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE"));
    assert!(stdout.contains("--async-depth"));
}

#[test]
fn test_version() {
    let output = fsstat().arg("-v").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("fsstat "));
}

#[test]
fn test_bad_arguments_exit_2() {
    let output = fsstat().args(["--concurrency", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = fsstat().args(["a", "b"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_root_exit_2() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("out.db");
    let output = fsstat()
        .arg(temp_dir.path().join("missing"))
        .arg("--db")
        .arg(&db)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_scan_writes_database_and_json_summary() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();
    let db = temp_dir.path().join("fs_stats.db");

    let output = fsstat()
        .arg(&root)
        .arg("--db")
        .arg(&db)
        .args(["--save-all-files", "--json", "--top", "2", "--concurrency", "4"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(db.exists());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["record"]["file_count"], 4);
    assert_eq!(value["drain"]["records_persisted"], 8);
    assert_eq!(value["largest_directories"].as_array().unwrap().len(), 2);
}

#[test]
fn test_declining_overwrite_aborts() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();
    let db = temp_dir.path().join("fs_stats.db");
    std::fs::write(&db, b"keep me").unwrap();

    let mut child = fsstat()
        .arg(&root)
        .arg("--db")
        .arg(&db)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"n\n").unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Do you want to overwrite it?"));
    assert_eq!(std::fs::read(&db).unwrap(), b"keep me");
}

#[test]
fn test_assume_yes_replaces_existing_output() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_simple_fixture(temp_dir.path()).unwrap();
    let db = temp_dir.path().join("fs_stats.db");
    std::fs::write(&db, b"stale").unwrap();

    let output = fsstat()
        .arg(&root)
        .arg("--db")
        .arg(&db)
        .arg("-y")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(fsstat::services::sink::sqlite::count_records(&db).unwrap() >= 4);
}
