//! Behavioral specifications for the drts CLI.
//!
//! These tests are black-box: they invoke the built binaries and verify
//! stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// daemon/
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;

// job/
#[path = "specs/job/lifecycle.rs"]
mod job_lifecycle;
#[path = "specs/job/dispatch.rs"]
mod job_dispatch;
