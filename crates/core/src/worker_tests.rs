// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::capability::Capability;

fn registration(name: &str, caps: &[&str], slots: Option<u32>) -> Registration {
    Registration {
        name: WorkerName::new(name),
        hostname: format!("{name}.local"),
        capabilities: caps.iter().map(|c| c.parse::<Capability>().unwrap()).collect(),
        budget: ResourceBudget::default(),
        slots,
    }
}

#[test]
fn new_record_uses_default_slots() {
    let record = WorkerRecord::new(registration("w1", &["cpu"], None), 2, 10);
    assert_eq!(record.slots, 2);
    assert_eq!(record.generation, 1);
    assert_eq!(record.status(), WorkerStatus::Registered);
}

#[test]
fn zero_slots_is_clamped_to_one() {
    let record = WorkerRecord::new(registration("w1", &[], Some(0)), 1, 0);
    assert_eq!(record.slots, 1);
}

#[test]
fn status_reflects_assignments_and_loss() {
    let mut record = WorkerRecord::new(registration("w1", &[], Some(2)), 1, 0);
    record.assignments.insert(JobId::new("job-1"));
    assert_eq!(record.status(), WorkerStatus::Busy(vec![JobId::new("job-1")]));

    record.lost = true;
    assert_eq!(record.status(), WorkerStatus::Lost);
}

#[test]
fn eligibility_requires_capacity_capability_and_liveness() {
    let required: CapabilitySet = [Capability::new("cpu")].into_iter().collect();
    let mut record = WorkerRecord::new(registration("w1", &["cpu"], Some(1)), 1, 0);
    assert!(record.is_eligible(&required));

    record.assignments.insert(JobId::new("job-1"));
    assert!(!record.is_eligible(&required), "full worker is not eligible");

    record.assignments.clear();
    record.lost = true;
    assert!(!record.is_eligible(&required), "lost worker is not eligible");

    let gpu: CapabilitySet = [Capability::new("gpu")].into_iter().collect();
    record.lost = false;
    assert!(!record.is_eligible(&gpu));
}

#[test]
fn rebind_keeps_assignments_and_bumps_generation() {
    let mut record = WorkerRecord::new(registration("w1", &["cpu"], None), 1, 0);
    record.assignments.insert(JobId::new("job-1"));
    record.lost = true;
    record.lost_at_ms = Some(5);

    record.rebind(registration("w1", &["cpu", "gpu"], Some(4)), 1, 20);

    assert!(!record.lost);
    assert_eq!(record.lost_at_ms, None);
    assert_eq!(record.generation, 2);
    assert_eq!(record.slots, 4);
    assert_eq!(record.capabilities.len(), 2);
    assert!(record.assignments.contains(&JobId::new("job-1")));
}

#[test]
fn worker_status_serializes_with_tag() {
    let json = serde_json::to_value(WorkerStatus::Busy(vec![JobId::new("j")])).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "busy", "jobs": ["j"] }));
}
