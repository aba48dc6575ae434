// tests/guard_cli.rs
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn guard(args: &[&str], lock_path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_guard"))
        .args(args)
        .arg("--lock-path")
        .arg(lock_path)
        .output()
        .expect("spawn guard binary")
}

fn stdout(o: &Output) -> String {
    String::from_utf8_lossy(&o.stdout).into_owned()
}

#[test]
fn check_on_fresh_root_is_ok() {
    let tmp = tempfile::tempdir().unwrap();
    let out = guard(&["--check"], &tmp.path().join(".lite/lock.json"));
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("[OK]"));
}

#[test]
fn lock_then_check_exits_3_with_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let lock_path = tmp.path().join(".lite/lock.json");

    let out = guard(&["--lock"], &lock_path);
    assert_eq!(out.status.code(), Some(0));
    assert!(lock_path.exists());

    let marker: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&lock_path).unwrap()).unwrap();
    let ts = marker["locked_at"].as_str().unwrap().to_string();
    assert_eq!(ts.len(), "2024-01-01T00:00:00Z".len());
    assert!(ts.ends_with('Z'));
    assert_eq!(marker["note"], "one-shot lite lock");

    let out = guard(&["--check"], &lock_path);
    assert_eq!(out.status.code(), Some(3));
    let msg = stdout(&out);
    assert!(msg.contains("[LOCKED]"));
    assert!(msg.contains(&format!("locked_at={ts}")));
}

#[test]
fn corrupt_marker_still_locks() {
    let tmp = tempfile::tempdir().unwrap();
    let lock_path = tmp.path().join("lock.json");
    fs::write(&lock_path, "this is not json").unwrap();

    let out = guard(&["--check"], &lock_path);
    assert_eq!(out.status.code(), Some(3));
    let msg = stdout(&out);
    assert!(msg.contains("[LOCKED]"));
    assert!(!msg.contains("locked_at="));
}

#[test]
fn no_mode_prints_usage_and_exits_1() {
    let tmp = tempfile::tempdir().unwrap();
    let out = guard(&[], &tmp.path().join("lock.json"));
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("Usage"));
}

#[test]
fn both_modes_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let out = guard(&["--check", "--lock"], &tmp.path().join("lock.json"));
    assert_eq!(out.status.code(), Some(1));
    assert!(!tmp.path().join("lock.json").exists());
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let out = guard(&["--unlock"], &tmp.path().join("lock.json"));
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn lock_write_failure_exits_2() {
    let tmp = tempfile::tempdir().unwrap();
    // The marker's parent is a regular file, so the directory can't be created.
    let blocker = tmp.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let out = guard(&["--lock"], &blocker.join("lock.json"));
    assert_eq!(out.status.code(), Some(2));
}
