// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Global constants for the privatedns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `PrivateDNS` CRD
pub const API_GROUP: &str = "privatedns.io";

/// API version for the `PrivateDNS` CRD
pub const API_VERSION: &str = "v1";

/// Kind name for the `PrivateDNS` resource
pub const KIND_PRIVATE_DNS: &str = "PrivateDNS";

// ============================================================================
// DNS Record Constants
// ============================================================================

/// TTL applied to every record the controller writes (seconds)
pub const RECORD_TTL_SECS: i64 = 60;

/// Interval between change-status polls while a submitted change is pending
pub const CHANGE_POLL_INTERVAL_SECS: u64 = 1;

// ============================================================================
// Pod Watcher Constants
// ============================================================================

/// Interval between pod lookups while waiting for an address to be assigned
pub const ADDRESS_POLL_INTERVAL_SECS: u64 = 2;

/// Default `pod-timeout` when the resource does not set one (2 minutes)
pub const DEFAULT_POD_TIMEOUT_SECS: u64 = 120;

/// Grace period for in-flight work after the workers have been stopped
pub const SHUTDOWN_DRAIN_SECS: u64 = 1;

// ============================================================================
// GCE Metadata Constants
// ============================================================================

/// Base URL of the GCE metadata service
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Number of attempts for a metadata lookup before giving up
pub const METADATA_ATTEMPTS: u32 = 3;

/// Safety margin subtracted from an access token's lifetime before it is
/// considered expired (seconds)
pub const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of Tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Metrics HTTP server bind address
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";

/// Metrics HTTP server port
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Metrics HTTP server path
pub const METRICS_SERVER_PATH: &str = "/metrics";

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default lease duration in seconds
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default lease retry period in seconds
pub const DEFAULT_LEASE_RETRY_PERIOD_SECS: u64 = 2;
