//! Integration tests for parsing server data.
//!
//! These tests run captured webservice responses through the envelope handling of
//! robot-core and deserialize them into the robot-server models.

use chrono::NaiveDate;
use robot_core::envelope;
use robot_server::models::{Server, ServerStatus};
use std::fs;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> Vec<u8> {
    let fixture_path = fixtures_dir().join(name);
    fs::read(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

fn load_server_list() -> Vec<Server> {
    let value = envelope::unwrap_array(&load_fixture("server_list.json"), "server")
        .expect("server list should unwrap");
    serde_json::from_value(value).expect("server list should deserialize")
}

#[test]
fn test_deserialize_server_list() {
    let servers = load_server_list();
    assert_eq!(servers.len(), 2, "Expected 2 servers in test data");
}

#[test]
fn test_ready_server_fields() {
    let servers = load_server_list();
    let server = servers
        .iter()
        .find(|s| s.server_number == 321)
        .expect("Should have server 321");

    assert_eq!(server.server_name, "server1");
    assert_eq!(server.status, ServerStatus::Ready);
    assert!(server.is_ready());
    assert!(!server.cancelled);
    assert_eq!(
        server.paid_until,
        NaiveDate::from_ymd_opt(2010, 9, 2).unwrap()
    );
    assert_eq!(server.ip, vec!["123.123.123.123"]);

    let subnets = server.subnet.as_ref().expect("Should have subnets");
    assert_eq!(subnets[0].mask, "64");

    // List entries carry no feature flags
    assert!(server.reset.is_none());
}

#[test]
fn test_in_process_server_without_subnets() {
    let servers = load_server_list();
    let server = servers
        .iter()
        .find(|s| s.server_number == 421)
        .expect("Should have server 421");

    assert_eq!(server.status, ServerStatus::InProcess);
    assert!(server.cancelled);
    assert!(server.subnet.is_none());
}

#[test]
fn test_server_detail_auto_unwrap() {
    let value = envelope::unwrap(&load_fixture("server_detail.json")).unwrap();
    let server: Server = serde_json::from_value(value).unwrap();

    assert_eq!(server.product, "EQ 8");
    assert_eq!(server.reset, Some(true));
    assert_eq!(server.hot_swap, Some(false));
}
