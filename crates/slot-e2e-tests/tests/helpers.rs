//! Test helpers for E2E tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use slot_metrics::Ad;
use tempfile::TempDir;

/// Poll time used by every glidein test.
pub const NOW_SECS: i64 = 1_700_000_000;

/// The fixed poll time as a timestamp.
pub fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(NOW_SECS, 0).single().expect("valid timestamp")
}

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Converts a JSON object literal into an ad.
pub fn ad(value: Value) -> Ad {
    value.as_object().cloned().expect("ad literal is an object")
}

/// A small mixed pool: one static slot, one partitionable slot with two
/// dynamic children and one old glidein.
pub fn startd_ads() -> Vec<Ad> {
    vec![
        ad(json!({
            "SlotType": "Static", "State": "Owner", "Name": "slot1@desk01.example",
            "Cpus": 2, "Memory": 4000, "Disk": 200000, "LoadAvg": 0.25
        })),
        ad(json!({
            "SlotType": "Partitionable", "State": "Unclaimed", "Name": "slot1@wn01.example",
            "Cpus": 12, "Memory": 24000, "Disk": 2000000, "LoadAvg": 0.0,
            "TotalSlotCpus": 16, "TotalCpus": 16, "TotalSlotMemory": 32000,
            "TotalMemory": 32000, "TotalSlotDisk": 3000000, "TotalDisk": 3000000,
            "TotalCondorLoadAvg": 3.5, "TotalLoadAvg": 3.75
        })),
        ad(json!({
            "SlotType": "Dynamic", "State": "Claimed", "Name": "slot1_1@wn01.example",
            "Cpus": 2, "Memory": 4096, "Disk": 100000, "LoadAvg": 1.75,
            "AccountingGroup": "group_physics.alice@submit.example"
        })),
        ad(json!({
            "SlotType": "Dynamic", "State": "Claimed", "Name": "slot1_2@wn01.example",
            "Cpus": 2, "Memory": 1024, "Disk": 100000, "LoadAvg": 1.75,
            "AccountingGroup": "group_physics.alice@submit.example"
        })),
        ad(json!({
            "SlotType": "Static", "State": "Claimed", "Name": "glidein_1@pilot.example",
            "is_glidein": true, "GLIDEIN_Site": "T2_US_Nebraska",
            "GLIDEIN_Resource_Name": "Nebraska_CE", "DaemonStartTime": NOW_SECS - 3600,
            "Cpus": 1, "Memory": 2500, "Disk": 1000, "LoadAvg": 0.5,
            "RemoteOwner": "carol@submit.example",
            "AccountingGroup": "group_cms.carol@submit.example"
        })),
    ]
}

/// The drain daemon's ad.
pub fn defrag_ad() -> Ad {
    ad(json!({
        "MyType": "Defrag", "Name": "defrag@cm.example",
        "MachinesDraining": 1, "WholeMachines": 4, "DrainSuccesses": 17
    }))
}

/// Running and idle jobs of one schedd.
pub fn job_ads(rss_kb: i64, disk_kb: i64) -> Vec<Ad> {
    vec![
        ad(json!({"JobStatus": 2, "ResidentSetSize_RAW": rss_kb, "DiskUsage_RAW": disk_kb})),
        ad(json!({"JobStatus": 1, "ResidentSetSize_RAW": 1_000_000, "DiskUsage_RAW": 1_000_000})),
    ]
}

/// Writes `ads` as a JSON array at `root/relative`.
pub fn write_ads(root: &Path, relative: &str, ads: &[Ad]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&path, serde_json::to_string(ads).expect("serialize ads")).expect("write ads");
}

/// Dumps the whole test pool into a temporary directory.
pub fn pool_dump() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let mut any = startd_ads();
    any.push(defrag_ad());
    write_ads(dir.path(), "startd.json", &startd_ads());
    write_ads(dir.path(), "any.json", &any);
    write_ads(dir.path(), "schedds/submit01.json", &job_ads(4096, 300));
    write_ads(dir.path(), "schedds/submit02.json", &job_ads(2048, 200));
    dir
}
