//! Exit-status contract of the `skypescape` binary.

mod common;

use common::{Fixture, row_count};
use std::fs;
use std::process::Command;

fn run(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_skypescape"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute skypescape");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn missing_db_path_prints_usage_and_exits_1() {
    let (stdout, _stderr, code) = run(&[]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Specify path to main.db"));
}

#[test]
fn exports_list_to_given_path() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::create(dir.path());
    fx.conversation(1, "Pair")
        .participant(1, "alice", "Alice")
        .participant(1, "bob", "Bob");
    let out = dir.path().join("list.html");

    let db = fx.path.to_string_lossy().to_string();
    let out_arg = out.to_string_lossy().to_string();
    let (_stdout, stderr, code) = run(&[db.as_str(), out_arg.as_str()]);
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(row_count(&fs::read_to_string(&out).unwrap()), 1);
}

#[test]
fn never_overwrites_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let fx = Fixture::create(dir.path());
    let out = dir.path().join("list.html");
    fs::write(&out, "keep me").unwrap();

    let db = fx.path.to_string_lossy().to_string();
    let out_arg = out.to_string_lossy().to_string();
    let (_stdout, stderr, code) = run(&[db.as_str(), out_arg.as_str()]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"), "stderr: {}", stderr);
    assert_eq!(fs::read_to_string(&out).unwrap(), "keep me");
}
