// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! # privatedns - Private Cloud DNS records for Kubernetes pods
//!
//! privatedns is a Kubernetes controller that keeps authoritative records in
//! a cloud-hosted DNS zone in sync with the live set of pods selected by
//! `PrivateDNS` custom resources. Every matching pod gets a forward A record
//! named after itself and its owner; resources can additionally opt into a
//! shared-service aggregate A record, an SRV service locator and (when the
//! controller is configured with a reverse zone) PTR records.
//!
//! ## Architecture
//!
//! Two-tier reconciliation:
//!
//! - The [`controller`] watches `PrivateDNS` resources and maintains exactly
//!   one [`records::RecordsManager`] per live resource.
//! - Each records manager watches the pods matching its resource's label
//!   selector and translates pod lifecycle events into batched DNS changes
//!   through the [`dns`] provider.
//!
//! ## Modules
//!
//! - [`crd`] - The `PrivateDNS` custom resource definition
//! - [`controller`] - Resource watch and worker registry
//! - [`records`] - Per-resource pod watcher and pending-address handling
//! - [`dns`] - Change batcher and the Cloud DNS backend
//! - [`gcp`] - GCE metadata client (project, cluster identity, tokens)
//! - [`naming`] - Pure record-name construction
//!
//! ## Example
//!
//! ```rust,no_run
//! use privatedns::crd::PrivateDNSSpec;
//!
//! let spec = PrivateDNSSpec {
//!     label: "app=pg".to_string(),
//!     domain: "example.com".to_string(),
//!     srv_port: Some("5432".to_string()),
//!     srv_protocol: Some("tcp".to_string()),
//!     pod_timeout: Some("2m".to_string()),
//!     service: true,
//!     subdomain: false,
//! };
//! ```

pub mod constants;
pub mod controller;
pub mod crd;
pub mod dns;
pub mod duration;
pub mod gcp;
pub mod metrics;
pub mod naming;
pub mod records;

#[cfg(test)]
mod crd_tests;
