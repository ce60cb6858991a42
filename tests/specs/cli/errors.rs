//! CLI error handling specs.

use crate::prelude::*;

#[test]
fn execute_unsupported_language_fails() {
    cli()
        .args(&["execute", "-l", "cobol", "-c", "print 1"])
        .fails()
        .stderr_has("unsupported language");
}

#[test]
fn execute_rejects_both_file_and_code() {
    cli()
        .args(&["execute", "-l", "python", "-c", "print(1)", "-f", "whatever.py"])
        .fails()
        .stderr_has("cannot be used with");
}

#[test]
fn validate_unsupported_language_fails() {
    cli()
        .args(&["validate", "-l", "cobol", "-c", "print 1"])
        .fails()
        .stderr_has("unsupported language");
}

#[test]
fn logs_for_unknown_execution_id_fails() {
    cli().args(&["logs", "does-not-exist"]).fails();
}
