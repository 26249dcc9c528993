use std::path::Path;
use std::process::{Command, Output};

fn run_recur(dir: &Path, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_recur");
    Command::new(exe)
        .args(args)
        .env("RECUR_CONFIG_PATH", dir.join("config.json"))
        .env("RECUR_STATE_PATH", dir.join("state.json"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run recur")
}

fn read_state(dir: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.join("state.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn lists_is_empty_on_a_fresh_device() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_recur(dir.path(), &["lists"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No lists opened yet"));
}

#[test]
fn shared_link_becomes_active_list() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_recur(
        dir.path(),
        &["--open", "https://todo.example.com/Groceries%20Run/", "lists"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("* groceries run"));

    let state = read_state(dir.path());
    assert_eq!(state["activeListName"], "groceries run");
    assert_eq!(state["visitedListNames"], serde_json::json!(["groceries run"]));
}

#[test]
fn switch_and_forget_update_state() {
    let dir = tempfile::tempdir().unwrap();

    assert!(run_recur(dir.path(), &["switch", "home"]).status.success());
    assert!(run_recur(dir.path(), &["switch", "work"]).status.success());

    let output = run_recur(dir.path(), &["--json", "lists"]);
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["active"], "work");
    assert_eq!(payload["lists"], serde_json::json!(["home", "work"]));

    let output = run_recur(dir.path(), &["forget", "work"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Forgot list: work"));
    assert!(stdout.contains("* home"));

    let state = read_state(dir.path());
    assert_eq!(state["activeListName"], "home");
}

#[test]
fn forget_unknown_list_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_recur(dir.path(), &["switch", "home"]).status.success());

    let output = run_recur(dir.path(), &["forget", "nowhere"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No list named nowhere"));
    assert_eq!(read_state(dir.path())["activeListName"], "home");
}

#[test]
fn new_clears_the_active_list() {
    let dir = tempfile::tempdir().unwrap();
    assert!(run_recur(dir.path(), &["switch", "home"]).status.success());

    let output = run_recur(dir.path(), &["new"]);

    assert!(output.status.success());
    let state = read_state(dir.path());
    assert!(state["activeListName"].is_null());
    assert_eq!(state["visitedListNames"], serde_json::json!(["home"]));
}
