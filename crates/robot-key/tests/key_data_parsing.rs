//! Integration tests for parsing SSH key data.
//!
//! Key creation times are zone-less provider timestamps, so these tests also check how
//! the configured offset moves the decoded instant.

use chrono::{Datelike, FixedOffset, Timelike, Utc};
use robot_core::envelope;
use robot_key::models::{KeyRecord, SshKey};
use std::fs;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_records() -> Vec<KeyRecord> {
    let fixture_path = fixtures_dir().join("key_list.json");
    let body = fs::read(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read key fixture at {}: {}",
            fixture_path.display(),
            e
        )
    });

    let value = envelope::unwrap_array(&body, "key").expect("key list should unwrap");
    serde_json::from_value(value).expect("key list should deserialize")
}

fn load_keys(offset_secs: i32) -> Vec<SshKey> {
    let offset = FixedOffset::east_opt(offset_secs).unwrap();
    load_records()
        .into_iter()
        .map(|record| record.into_key(offset).unwrap())
        .collect()
}

#[test]
fn test_deserialize_key_list() {
    let records = load_records();
    assert_eq!(records.len(), 2, "Expected 2 keys in test data");
    assert_eq!(records[1].key_type, "RSA");
    assert_eq!(records[1].size, 4096);
}

#[test]
fn test_created_at_in_cet() {
    let keys = load_keys(3600);
    let deploy = keys
        .iter()
        .find(|k| k.name == "deploy")
        .expect("Should have the deploy key");

    assert_eq!(deploy.created_at.hour(), 14);
    assert_eq!(deploy.created_at.with_timezone(&Utc).hour(), 13);
}

#[test]
fn test_offset_can_cross_midnight() {
    let keys = load_keys(3600);
    let backup = keys
        .iter()
        .find(|k| k.name == "backup")
        .expect("Should have the backup key");

    // 00:30 CET is still the previous day in UTC
    let utc = backup.created_at.with_timezone(&Utc);
    assert_eq!((utc.month(), utc.day(), utc.hour()), (6, 30, 23));
}

#[test]
fn test_same_wall_clock_differs_per_offset() {
    let cet = load_keys(3600);
    let utc = load_keys(0);
    assert_eq!((utc[0].created_at - cet[0].created_at).num_seconds(), 3600);
}
