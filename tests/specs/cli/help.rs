//! Help and version output

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("submit")
        .stdout_has("cleanup")
        .stdout_has("workers")
        .stdout_has("daemon");
}

#[test]
fn no_arguments_prints_help() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn version_matches_package() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_eq(&format!("drts {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn daemon_help_lists_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}
