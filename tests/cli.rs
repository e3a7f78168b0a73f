#![cfg(unix)]

use std::process::{Command, Output};

fn execute(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_execute"))
        .args(args)
        .output()
        .expect("binary runs")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn successful_command_exits_zero() {
    let output = execute(&["-v", "--", "true"]);
    assert_eq!(output.status.code(), Some(0));

    let stderr = stderr(&output);
    assert!(stderr.contains("main: task start date = "));
    assert!(stderr.contains("main: task stop date = "));
    assert!(stderr.contains("main: task's result = 0"));
    assert!(stderr.contains("main: will next call exit(0)"));
}

#[test]
fn failing_command_exits_one() {
    let output = execute(&["--", "sh", "-c", "exit 3"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("`sh` finished with exit status: 3"));
}

#[test]
fn no_exit_still_fails_through_main() {
    let output = execute(&["--no-exit", "--", "false"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!stderr(&output).contains("will next call exit"));
}

#[test]
fn no_exit_success_returns_normally() {
    let output = execute(&["--no-exit", "-v", "--", "true"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(!stderr(&output).contains("task's result"));
}

#[test]
fn missing_command_is_an_error() {
    let output = execute(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no command given"));
}

fn entry_point(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_entry_point"))
        .args(args)
        .output()
        .expect("binary runs")
}

#[test]
fn entry_point_main_exits_with_zero() {
    let output = entry_point(&[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("main kept running"));

    let stderr = stderr(&output);
    assert!(stderr.contains("entry_point"));
    assert!(stderr.contains("main: will next call exit(0)"));
}

#[test]
fn entry_point_main_exits_with_one_on_failure() {
    let output = entry_point(&["fail"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = stderr(&output);
    assert!(stderr.contains("main: UNEXPECTED failure caught: asked to fail"));
    assert!(stderr.contains("main: will next call exit(1)"));
}
