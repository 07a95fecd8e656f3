// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Canonical DNS names derived from pods and resource specifications.
//!
//! All functions here are pure. Names are produced without a trailing dot;
//! the provider appends the dot when it builds wire records.

use k8s_openapi::api::core::v1::Pod;

/// Forward A record name for a single pod: `<pod>.<owner>.<domain>`.
///
/// # Example
///
/// ```
/// use privatedns::naming::pod_fqdn;
///
/// assert_eq!(pod_fqdn("db-0", "db", "example.com"), "db-0.db.example.com");
/// ```
#[must_use]
pub fn pod_fqdn(pod_name: &str, owner: &str, domain: &str) -> String {
    format!("{pod_name}.{owner}.{domain}")
}

/// Shared-service A record name: `<owner>.<domain>`.
#[must_use]
pub fn service_fqdn(owner: &str, domain: &str) -> String {
    format!("{owner}.{domain}")
}

/// SRV owner name: `_<port>._<proto>.<domain>`.
///
/// # Example
///
/// ```
/// use privatedns::naming::srv_owner_name;
///
/// assert_eq!(srv_owner_name("5432", "tcp", "example.com"), "_5432._tcp.example.com");
/// ```
#[must_use]
pub fn srv_owner_name(port: &str, proto: &str, domain: &str) -> String {
    format!("_{port}._{proto}.{domain}")
}

/// Effective domain for a subdomain-scoped resource:
/// `<cluster-name>.<cluster-location>.<domain>`.
#[must_use]
pub fn cluster_scoped_domain(cluster_name: &str, cluster_location: &str, domain: &str) -> String {
    format!("{cluster_name}.{cluster_location}.{domain}")
}

/// Registry key for a namespaced object: `<namespace>/<name>`.
#[must_use]
pub fn registry_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Name of the pod's controlling owner (the statefulset or deployment behind
/// the first owner reference).
///
/// Pods without owner references cannot be named and are skipped by the
/// watcher.
#[must_use]
pub fn pod_owner(pod: &Pod) -> Option<&str> {
    pod.metadata
        .owner_references
        .as_ref()
        .and_then(|refs| refs.first())
        .map(|owner| owner.name.as_str())
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
