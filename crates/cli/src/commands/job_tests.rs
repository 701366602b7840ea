// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    submit: SubmitArgs,
}

fn parse(args: &[&str]) -> SubmitArgs {
    let mut argv = vec!["drts"];
    argv.extend_from_slice(args);
    TestCli::try_parse_from(argv).unwrap().submit
}

#[test]
fn defaults_to_single_worker_without_requirements() {
    let requirements = parse(&[]).requirements();
    assert_eq!(requirements.degree, 1);
    assert!(requirements.capabilities.is_empty());
    assert!(!requirements.reassignable);
}

#[test]
fn capabilities_accumulate_with_and_without_values() {
    let args = parse(&["-c", "gpu=a100", "--capability", "linux", "--degree", "2"]);
    let requirements = args.requirements();

    assert_eq!(requirements.degree, 2);
    assert_eq!(requirements.capabilities.len(), 2);
    assert!(requirements
        .capabilities
        .provides(&Capability::with_value("gpu", "a100")));
    assert!(requirements.capabilities.provides(&Capability::new("linux")));
}

#[test]
fn reassignable_flag_reaches_requirements() {
    assert!(parse(&["--reassignable"]).requirements().reassignable);
}

#[yare::parameterized(
    empty_name  = { "=x" },
    empty_value = { "gpu=" },
)]
fn malformed_capability_is_rejected(raw: &str) {
    let result = TestCli::try_parse_from(["drts", "--capability", raw]);
    assert!(result.is_err());
}

#[test]
fn payload_must_be_json() {
    assert_eq!(
        parse(&["--payload", r#"{"n":3}"#]).payload,
        Some(serde_json::json!({ "n": 3 }))
    );
    assert!(TestCli::try_parse_from(["drts", "--payload", "{nope"]).is_err());
}

#[test]
fn explicit_id_is_kept() {
    assert_eq!(parse(&["--id", "job-7"]).id.as_deref(), Some("job-7"));
}
