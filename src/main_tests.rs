// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Unit tests for configuration loading.

use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn lookup(map: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
    move |name| map.get(name).cloned()
}

#[test]
fn test_controller_config_requires_zone() {
    let vars = env(&[]);
    assert!(load_controller_config_from(lookup(&vars)).is_err());

    let vars = env(&[("PRIVATEDNS_ZONE", "")]);
    assert!(load_controller_config_from(lookup(&vars)).is_err());
}

#[test]
fn test_controller_config_minimal() {
    let vars = env(&[("PRIVATEDNS_ZONE", "private-zone")]);
    let config = load_controller_config_from(lookup(&vars)).unwrap();

    assert_eq!(config.zone, "private-zone");
    assert!(config.reverse_zone.is_none());
    assert!(config.project.is_none());
    assert!(config.namespace.is_none());
}

#[test]
fn test_controller_config_full() {
    let vars = env(&[
        ("PRIVATEDNS_ZONE", "private-zone"),
        ("PRIVATEDNS_REVERSE_ZONE", "reverse-zone"),
        ("PRIVATEDNS_PROJECT", "my-project"),
        ("PRIVATEDNS_NAMESPACE", "prod"),
    ]);
    let config = load_controller_config_from(lookup(&vars)).unwrap();

    assert_eq!(config.zone, "private-zone");
    assert_eq!(config.reverse_zone.as_deref(), Some("reverse-zone"));
    assert_eq!(config.project.as_deref(), Some("my-project"));
    assert_eq!(config.namespace.as_deref(), Some("prod"));
}

#[test]
fn test_controller_config_empty_values_treated_as_unset() {
    let vars = env(&[
        ("PRIVATEDNS_ZONE", "private-zone"),
        ("PRIVATEDNS_REVERSE_ZONE", ""),
        ("PRIVATEDNS_NAMESPACE", ""),
    ]);
    let config = load_controller_config_from(lookup(&vars)).unwrap();

    assert!(config.reverse_zone.is_none());
    assert!(config.namespace.is_none());
}

#[test]
fn test_leader_election_defaults() {
    let vars = env(&[]);
    let config = load_leader_election_config_from(lookup(&vars));

    assert!(config.enabled);
    assert_eq!(config.lease_name, "privatedns-leader");
    assert_eq!(config.lease_namespace, "kube-system");
    assert_eq!(config.lease_duration, 15);
    assert_eq!(config.retry_period, 2);
    assert!(config.identity.starts_with("privatedns-"));
}

#[test]
fn test_leader_election_disabled() {
    let vars = env(&[("PRIVATEDNS_ENABLE_LEADER_ELECTION", "false")]);
    let config = load_leader_election_config_from(lookup(&vars));
    assert!(!config.enabled);
}

#[test]
fn test_leader_election_identity_prefers_pod_name() {
    let vars = env(&[
        ("POD_NAME", "privatedns-7c9f"),
        ("HOSTNAME", "some-node"),
    ]);
    let config = load_leader_election_config_from(lookup(&vars));
    assert_eq!(config.identity, "privatedns-7c9f");
}

#[test]
fn test_leader_election_namespace_falls_back_to_pod_namespace() {
    let vars = env(&[("POD_NAMESPACE", "dns-system")]);
    let config = load_leader_election_config_from(lookup(&vars));
    assert_eq!(config.lease_namespace, "dns-system");
}

#[test]
fn test_leader_election_custom_timings() {
    let vars = env(&[
        ("PRIVATEDNS_LEASE_DURATION_SECONDS", "30"),
        ("PRIVATEDNS_LEASE_RETRY_PERIOD_SECONDS", "5"),
    ]);
    let config = load_leader_election_config_from(lookup(&vars));
    assert_eq!(config.lease_duration, 30);
    assert_eq!(config.retry_period, 5);
}
