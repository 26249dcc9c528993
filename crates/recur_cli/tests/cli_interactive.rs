use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

fn run_interactive(dir: &Path, args: &[&str], input: &str) -> Output {
    let exe = env!("CARGO_BIN_EXE_recur");

    let mut child = Command::new(exe)
        .args(args)
        .env("RECUR_CONFIG_PATH", dir.join("config.json"))
        .env("RECUR_STATE_PATH", dir.join("state.json"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}

#[test]
fn interactive_help_shows_usage() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), &["--offline", "--open", "/home"], "help\nexit\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn interactive_invalid_command_prints_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), &["--offline", "--open", "/home"], "nope\nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}

#[test]
fn interactive_prompts_for_a_list_name() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), &["--offline"], "\n  Chores \nexit\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("List name:"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("List name:"));
    assert!(stdout.contains("List: chores"));

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["activeListName"], "chores");
}

#[test]
fn interactive_add_done_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let input = "add \"Water plants\" --every 1w\n\
                 add \"Renew passport\"\n\
                 done mem000000000002\n\
                 list\n\
                 exit\n";
    let output = run_interactive(dir.path(), &["--offline", "--open", "/home"], input);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: Water plants (mem000000000001)"));
    assert!(stdout.contains("Completed task: Renew passport (mem000000000002)"));
    assert!(stdout.contains("mem000000000001 | Water plants | every week"));
    assert!(stdout.contains("[x] mem000000000002 | Renew passport"));
}

#[test]
fn interactive_rejects_bad_interval() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(
        dir.path(),
        &["--offline", "--open", "/home"],
        "add \"Pay rent\" --every 1m\nlist\nexit\n",
    );

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: parse"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Pay rent"));
}

#[test]
fn interactive_missing_task_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(
        dir.path(),
        &["--offline", "--open", "/home"],
        "done ghost\nexit\n",
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No task with id ghost"));
}

#[test]
fn interactive_switch_loads_the_other_list() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(
        dir.path(),
        &["--offline", "--open", "/home"],
        "switch work\nlists\nexit\n",
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Opened list: work"));
    assert!(stdout.contains("* work"));
    assert!(stdout.contains("  home"));
}

#[test]
fn json_output_is_not_mixed_with_the_name_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_interactive(dir.path(), &["--offline", "--json", "list"], "Home\n");

    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["list_name"], "home");
    assert_eq!(payload["pending"], serde_json::json!([]));
}

#[test]
fn interactive_session_reopens_due_tasks_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let exe = env!("CARGO_BIN_EXE_recur");

    let mut child = Command::new(exe)
        .args([
            "--offline",
            "--open",
            "/home",
            "--config-override",
            "tick_interval_ms=50",
        ])
        .env("RECUR_CONFIG_PATH", dir.path().join("config.json"))
        .env("RECUR_STATE_PATH", dir.path().join("state.json"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(b"add \"Feed cat\" --every 0d\ndone mem000000000001\n")
            .expect("failed to write to stdin");
        stdin.flush().expect("failed to flush stdin");
        thread::sleep(Duration::from_millis(500));
        stdin
            .write_all(b"list\nexit\n")
            .expect("failed to write to stdin");
    }

    let output = child
        .wait_with_output()
        .expect("failed to read interactive output");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Completed task: Feed cat (mem000000000001)"));
    assert!(stdout.contains("Due again: Feed cat (mem000000000001)"));

    let listing = stdout.rsplit("List: home").next().unwrap();
    assert!(listing.contains("[ ] mem000000000001 | Feed cat"));
    assert!(!listing.contains("[x] mem000000000001"));
}
