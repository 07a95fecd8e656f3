// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Unit tests for the `PrivateDNS` CRD schema.

use crate::crd::{PrivateDNS, PrivateDNSSpec};
use kube::core::CustomResourceExt;
use kube::ResourceExt;

fn minimal_spec_json() -> serde_json::Value {
    serde_json::json!({
        "label": "app=pg",
        "domain": "example.com"
    })
}

#[test]
fn test_minimal_spec_deserializes_with_defaults() {
    let spec: PrivateDNSSpec = serde_json::from_value(minimal_spec_json()).unwrap();

    assert_eq!(spec.label, "app=pg");
    assert_eq!(spec.domain, "example.com");
    assert!(spec.srv_port.is_none());
    assert!(spec.srv_protocol.is_none());
    assert!(spec.pod_timeout.is_none());
    assert!(!spec.service);
    assert!(!spec.subdomain);
}

#[test]
fn test_full_spec_uses_kebab_case_field_names() {
    let spec: PrivateDNSSpec = serde_json::from_value(serde_json::json!({
        "label": "app=redis",
        "domain": "example.com",
        "srv-port": "6379",
        "srv-protocol": "tcp",
        "pod-timeout": "2m",
        "service": true,
        "subdomain": true
    }))
    .unwrap();

    assert_eq!(spec.srv_port.as_deref(), Some("6379"));
    assert_eq!(spec.srv_protocol.as_deref(), Some("tcp"));
    assert_eq!(spec.pod_timeout.as_deref(), Some("2m"));
    assert!(spec.service);
    assert!(spec.subdomain);
}

#[test]
fn test_spec_serializes_kebab_case() {
    let spec = PrivateDNSSpec {
        label: "app=pg".to_string(),
        domain: "example.com".to_string(),
        srv_port: Some("5432".to_string()),
        srv_protocol: Some("tcp".to_string()),
        pod_timeout: Some("30s".to_string()),
        service: true,
        subdomain: false,
    };

    let value = serde_json::to_value(&spec).unwrap();
    assert!(value.get("srv-port").is_some());
    assert!(value.get("srv-protocol").is_some());
    assert!(value.get("pod-timeout").is_some());
    assert!(value.get("srv_port").is_none());
}

#[test]
fn test_optional_fields_omitted_when_unset() {
    let spec: PrivateDNSSpec = serde_json::from_value(minimal_spec_json()).unwrap();
    let value = serde_json::to_value(&spec).unwrap();

    assert!(value.get("srv-port").is_none());
    assert!(value.get("srv-protocol").is_none());
    assert!(value.get("pod-timeout").is_none());
}

#[test]
fn test_missing_required_fields_rejected() {
    let missing_domain: Result<PrivateDNSSpec, _> =
        serde_json::from_value(serde_json::json!({ "label": "app=pg" }));
    assert!(missing_domain.is_err());

    let missing_label: Result<PrivateDNSSpec, _> =
        serde_json::from_value(serde_json::json!({ "domain": "example.com" }));
    assert!(missing_label.is_err());
}

#[test]
fn test_crd_metadata() {
    let crd = PrivateDNS::crd();

    assert_eq!(crd.spec.group, crate::constants::API_GROUP);
    assert_eq!(crd.spec.names.kind, crate::constants::KIND_PRIVATE_DNS);
    assert_eq!(crd.spec.names.plural, "privatednses");
    assert_eq!(
        crd.spec.names.short_names.as_deref(),
        Some(&["pdns".to_string()][..])
    );
    assert_eq!(crd.spec.scope, "Namespaced");

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, crate::constants::API_VERSION);
}

#[test]
fn test_resource_roundtrip() {
    let resource: PrivateDNS = serde_json::from_value(serde_json::json!({
        "apiVersion": "privatedns.io/v1",
        "kind": "PrivateDNS",
        "metadata": { "name": "db", "namespace": "prod" },
        "spec": minimal_spec_json()
    }))
    .unwrap();

    assert_eq!(resource.name_any(), "db");
    assert_eq!(resource.namespace().as_deref(), Some("prod"));
    assert_eq!(resource.spec.domain, "example.com");
}
