// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn set(items: &[&str]) -> CapabilitySet {
    items.iter().map(|s| s.parse::<Capability>().unwrap()).collect()
}

#[yare::parameterized(
    name_only     = { "cpu",        "cpu",  None },
    with_value    = { "gpu=a100",   "gpu",  Some("a100") },
    trims_spaces  = { " gpu = v ",  "gpu",  Some("v") },
)]
fn parse_capability(input: &str, name: &str, value: Option<&str>) {
    let cap: Capability = input.parse().unwrap();
    assert_eq!(cap.name, name);
    assert_eq!(cap.value.as_deref(), value);
}

#[yare::parameterized(
    empty       = { "" },
    empty_name  = { "=x" },
    empty_value = { "gpu=" },
)]
fn parse_capability_rejects(input: &str) {
    assert!(input.parse::<Capability>().is_err());
}

#[yare::parameterized(
    empty_requirement      = { &[],               &["cpu"],               true },
    exact_match            = { &["cpu"],          &["cpu"],               true },
    superset_worker        = { &["cpu"],          &["cpu", "gpu=a100"],   true },
    missing_name           = { &["gpu"],          &["cpu"],               false },
    name_matches_any_value = { &["gpu"],          &["gpu=a100"],          true },
    value_mismatch         = { &["gpu=h100"],     &["gpu=a100"],          false },
    value_required_absent  = { &["gpu=a100"],     &["gpu"],               false },
    partial_overlap        = { &["cpu", "fpga"],  &["cpu", "gpu"],        false },
)]
fn subset_matching(required: &[&str], advertised: &[&str], expected: bool) {
    assert_eq!(set(required).is_subset_of(&set(advertised)), expected);
}

#[test]
fn insert_replaces_value() {
    let mut caps = set(&["gpu=a100"]);
    caps.insert(Capability::with_value("gpu", "h100"));
    assert_eq!(caps.len(), 1);
    assert!(caps.provides(&Capability::with_value("gpu", "h100")));
}

#[test]
fn display_is_sorted_and_comma_separated() {
    assert_eq!(set(&["gpu=a100", "cpu"]).to_string(), "cpu,gpu=a100");
}

#[test]
fn serializes_as_map() {
    let json = serde_json::to_value(set(&["cpu", "gpu=a100"])).unwrap();
    assert_eq!(json, serde_json::json!({ "cpu": null, "gpu": "a100" }));
}
