// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Unit tests for Cloud DNS wire shapes and URL construction.

use super::*;
use crate::dns::types::{ChangeSet, RecordSet, RecordType};

struct StaticToken;

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, DnsError> {
        Ok("test-token".to_string())
    }
}

fn client() -> CloudDns {
    CloudDns::new("my-project", Arc::new(StaticToken))
}

#[test]
fn test_rrsets_url() {
    let dns = client();
    assert_eq!(
        dns.rrsets_url("private-zone"),
        "https://dns.googleapis.com/dns/v1/projects/my-project/managedZones/private-zone/rrsets"
    );
}

#[test]
fn test_changes_url() {
    let dns = client();
    assert_eq!(
        dns.changes_url("private-zone"),
        "https://dns.googleapis.com/dns/v1/projects/my-project/managedZones/private-zone/changes"
    );
}

#[test]
fn test_custom_base_url() {
    let dns = CloudDns::with_base_url(
        "http://localhost:8053/dns/v1/projects/test".to_string(),
        Arc::new(StaticToken),
    );
    assert_eq!(
        dns.rrsets_url("z"),
        "http://localhost:8053/dns/v1/projects/test/managedZones/z/rrsets"
    );
}

#[test]
fn test_wire_record_set_uses_type_key() {
    let wire = WireRecordSet::from_record_set(&RecordSet::a("db-0.db.example.com", "10.0.0.5"));
    let value = serde_json::to_value(&wire).unwrap();

    assert_eq!(value["name"], "db-0.db.example.com.");
    assert_eq!(value["type"], "A");
    assert_eq!(value["ttl"], 60);
    assert_eq!(value["rrdatas"][0], "10.0.0.5");
}

#[test]
fn test_wire_record_set_deserializes_listing_entry() {
    let wire: WireRecordSet = serde_json::from_value(serde_json::json!({
        "kind": "dns#resourceRecordSet",
        "name": "db.example.com.",
        "type": "A",
        "ttl": 60,
        "rrdatas": ["10.0.0.5", "10.0.0.6"]
    }))
    .unwrap();

    let record = wire.into_record_set(RecordType::A);
    assert_eq!(record.name, "db.example.com.");
    assert_eq!(record.record_type, RecordType::A);
    assert_eq!(record.rrdatas, vec!["10.0.0.5", "10.0.0.6"]);
}

#[test]
fn test_wire_change_skips_empty_lists() {
    let mut change = ChangeSet::default();
    change.add(RecordSet::a("db-0.db.example.com", "10.0.0.5"));

    let wire = WireChange::from_change_set(&change);
    let value = serde_json::to_value(&wire).unwrap();

    assert!(value.get("additions").is_some());
    assert!(value.get("deletions").is_none());
    assert!(value.get("id").is_none());
    assert!(value.get("status").is_none());
}

#[test]
fn test_wire_change_parses_pending_response() {
    let wire: WireChange = serde_json::from_value(serde_json::json!({
        "kind": "dns#change",
        "id": "87",
        "status": "pending",
        "additions": [
            { "name": "db-0.db.example.com.", "type": "A", "ttl": 60, "rrdatas": ["10.0.0.5"] }
        ]
    }))
    .unwrap();

    assert_eq!(wire.id.as_deref(), Some("87"));
    assert_eq!(wire.status.as_deref(), Some("pending"));
    assert_eq!(wire.additions.len(), 1);
    assert!(wire.deletions.is_empty());
}
