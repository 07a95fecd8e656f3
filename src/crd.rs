// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for private DNS reconciliation scopes.
//!
//! A [`PrivateDNS`] resource declares one reconciliation scope: a label
//! selector over pods in its namespace, and the DNS suffix under which the
//! controller maintains records for those pods. For every `PrivateDNS`
//! resource the controller runs a dedicated pod watcher that translates pod
//! lifecycle events into Cloud DNS record mutations.
//!
//! # Record families
//!
//! - Forward A record per pod: `<pod>.<owner>.<domain>`
//! - Shared-service A record (all pod addresses under one owner):
//!   `<owner>.<domain>`, enabled by `service: true`
//! - SRV service locator: `_<srv-port>._<srv-protocol>.<domain>`, enabled when
//!   both `srv-port` and `srv-protocol` are set
//! - PTR reverse records, when the controller is configured with a reverse zone
//!
//! # Example
//!
//! ```yaml
//! apiVersion: privatedns.io/v1
//! kind: PrivateDNS
//! metadata:
//!   name: db
//!   namespace: prod
//! spec:
//!   label: "app=pg"
//!   domain: example.com
//!   service: true
//!   srv-port: "5432"
//!   srv-protocol: tcp
//!   pod-timeout: 2m
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `PrivateDNS` declares DNS records to be maintained for a set of pods.
///
/// The controller watches pods matching `label` in the resource's namespace
/// and keeps forward A records (and optionally shared-service A, SRV and PTR
/// records) in sync with the live pod set. Deleting the resource deletes all
/// records its watcher created.
#[derive(CustomResource, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "privatedns.io",
    version = "v1",
    kind = "PrivateDNS",
    plural = "privatednses",
    shortname = "pdns",
    namespaced
)]
#[serde(rename_all = "kebab-case")]
pub struct PrivateDNSSpec {
    /// Label selector expression for the pods in scope (e.g. `app=pg`).
    ///
    /// Evaluated by the API server; the same syntax as `kubectl get pods -l`.
    pub label: String,

    /// Base DNS suffix used to build record names, without a trailing dot
    /// (e.g. `example.com`).
    pub domain: String,

    /// Service port for SRV registration. Must be set together with
    /// `srv-protocol`; the SRV owner name becomes
    /// `_<srv-port>._<srv-protocol>.<domain>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv_port: Option<String>,

    /// Service protocol for SRV registration (e.g. `tcp`). Must be set
    /// together with `srv-port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv_protocol: Option<String>,

    /// How long the watcher waits for a pod to be assigned an address before
    /// deferring it to the pending table (Go-style duration, e.g. `2m`).
    /// Defaults to 2 minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_timeout: Option<String>,

    /// Maintain a shared-service A record `<owner>.<domain>` aggregating the
    /// addresses of every pod under one owner.
    #[serde(default)]
    pub service: bool,

    /// Prefix the domain with cluster identity, producing
    /// `<cluster-name>.<cluster-location>.<domain>`. Requires the cluster
    /// identity to be resolvable from the metadata service.
    #[serde(default)]
    pub subdomain: bool,
}
