//! CLI help output specs.

use crate::prelude::*;

#[test]
fn cx_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn cx_help_lists_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("execute")
        .stdout_has("validate")
        .stdout_has("languages")
        .stdout_has("stats");
}

#[test]
fn cx_execute_help_shows_usage() {
    cli().args(&["execute", "--help"]).passes().stdout_has("Usage:");
}

#[test]
fn cx_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn cx_no_args_fails_with_usage() {
    // Subcommand is required; clap exits non-zero and prints usage to stderr.
    cli().args(&[]).fails().stderr_has("Usage:");
}
