//! `cx execute`/`execute-stream`/`validate`/`stats` specs, driven entirely
//! against the in-memory fake container runtime (`--fake`) so the suite
//! never depends on a real Docker daemon.

use crate::prelude::*;

#[test]
fn execute_returns_scripted_stdout_and_completed_status() {
    cli()
        .env("CX_FAKE_STDOUT", "hello from sandbox\n")
        .env("CX_FAKE_EXIT_CODE", "0")
        .args(&["execute", "-l", "python", "-c", "print('hello from sandbox')"])
        .passes()
        .stdout_has("hello from sandbox")
        .stdout_has("COMPLETED");
}

#[test]
fn execute_json_carries_exit_code_and_status() {
    let run = cli()
        .env("CX_FAKE_STDOUT", "hi\n")
        .env("CX_FAKE_EXIT_CODE", "0")
        .args(&["-o", "json", "execute", "-l", "python", "-c", "print('hi')"])
        .passes();
    let value = run.json();
    assert_eq!(value["status"], "COMPLETED");
    assert_eq!(value["exit_code"], 0);
    assert_eq!(value["stdout"], "hi\n");
}

#[test]
fn execute_reads_source_from_stdin_when_no_file_or_code_flag() {
    cli()
        .env("CX_FAKE_STDOUT", "piped\n")
        .args(&["execute", "-l", "python"])
        .stdin("print('piped')")
        .passes()
        .stdout_has("piped");
}

#[test]
fn execute_nonzero_exit_code_is_still_completed_not_an_error() {
    // A failing user program is a COMPLETED execution with a nonzero exit
    // code, not a service error.
    let run = cli()
        .env("CX_FAKE_EXIT_CODE", "1")
        .args(&["-o", "json", "execute", "-l", "python", "-c", "import sys; sys.exit(1)"])
        .passes();
    let value = run.json();
    assert_eq!(value["status"], "COMPLETED");
    assert_eq!(value["exit_code"], 1);
}

#[test]
fn execute_stream_emits_start_and_one_terminal_event() {
    let run = cli()
        .env("CX_FAKE_STDOUT", "streamed\n")
        .args(&["-o", "json", "execute-stream", "-l", "python", "-c", "print('streamed')"])
        .passes();
    // Each event is printed pretty-printed, so they are concatenated JSON
    // documents rather than one-per-line; a streaming deserializer pulls
    // them apart regardless of the whitespace between them.
    let stdout = run.stdout();
    let events: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&stdout)
        .into_iter::<serde_json::Value>()
        .collect::<Result<_, _>>()
        .expect("stdout should be a sequence of JSON events");

    assert_eq!(events.first().unwrap()["type"], "start");
    let terminal_count = events
        .iter()
        .filter(|e| matches!(e["type"].as_str(), Some("complete") | Some("timeout") | Some("error")))
        .count();
    assert_eq!(terminal_count, 1, "expected exactly one terminal event, got {events:?}");
    assert_eq!(events.last().unwrap()["type"], "complete");
}

#[test]
fn validate_python_accepts_well_formed_source() {
    cli()
        .args(&["validate", "-l", "python", "-c", "def f():\n    return 1\n"])
        .passes()
        .stdout_has("valid");
}

#[test]
fn validate_python_rejects_unbalanced_brackets() {
    cli()
        .args(&["validate", "-l", "python", "-c", "def f(:\n    return 1\n"])
        .fails();
}

#[test]
fn stats_reports_zero_active_containers_before_any_execution() {
    cli().args(&["stats"]).passes().stdout_has("active_containers:       0");
}

#[test]
fn cleanup_session_reports_the_session_id() {
    cli()
        .args(&["cleanup-session", "session-abc"])
        .passes()
        .stdout_eq("cleaned up session session-abc\n");
}
