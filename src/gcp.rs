// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! GCE metadata service client.
//!
//! Resolves project and cluster identity, and serves as the
//! [`TokenSource`] for the Cloud DNS API. Every lookup is retried a few
//! times with a linearly growing delay; the metadata service is flaky for
//! the first seconds of an instance's life.

use crate::constants::{METADATA_ATTEMPTS, METADATA_BASE_URL, TOKEN_EXPIRY_MARGIN_SECS};
use crate::dns::clouddns::TokenSource;
use crate::dns::error::DnsError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Cluster identity collaborator: who am I, and where am I running.
///
/// Used to build the effective domain of `subdomain: true` resources.
#[async_trait]
pub trait ClusterIdentity: Send + Sync {
    /// Name of the Kubernetes cluster this controller runs in.
    async fn cluster_name(&self) -> Result<String>;

    /// Location (region or zone) of the cluster.
    async fn cluster_location(&self) -> Result<String>;
}

/// Client for the GCE metadata service.
pub struct GceMetadata {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Access-token payload served by the metadata service.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

impl Default for GceMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl GceMetadata {
    /// Client against the standard metadata endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(METADATA_BASE_URL.to_string())
    }

    /// Client against a custom endpoint (tests).
    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: Mutex::new(None),
        }
    }

    /// GCP project this instance belongs to.
    pub async fn project_id(&self) -> Result<String> {
        self.get("project/project-id").await
    }

    async fn request(&self, path: &str) -> Result<String> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .with_context(|| format!("Metadata request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("Metadata request to {url} returned HTTP {}", response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read metadata response from {url}"))
    }

    /// Fetch `path`, retrying with a linearly growing delay.
    async fn get(&self, path: &str) -> Result<String> {
        for attempt in 1..=METADATA_ATTEMPTS {
            match self.request(path).await {
                Ok(value) if !value.is_empty() => return Ok(value),
                Ok(_) => {
                    debug!(path, attempt, "Metadata lookup returned empty value");
                }
                Err(err) => {
                    warn!(path, attempt, error = %err, "Metadata lookup failed");
                }
            }
            tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
        }
        bail!("Failed to resolve metadata from {path}")
    }
}

#[async_trait]
impl ClusterIdentity for GceMetadata {
    async fn cluster_name(&self) -> Result<String> {
        self.get("instance/attributes/cluster-name").await
    }

    async fn cluster_location(&self) -> Result<String> {
        self.get("instance/attributes/cluster-location").await
    }
}

#[async_trait]
impl TokenSource for GceMetadata {
    async fn access_token(&self) -> Result<String, DnsError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.value.clone());
            }
        }

        let body = self
            .get("instance/service-accounts/default/token")
            .await
            .map_err(|e| DnsError::Credentials(e.to_string()))?;

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| DnsError::Credentials(e.to_string()))?;

        let lifetime = parsed
            .expires_in
            .saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        *cached = Some(CachedToken {
            value: parsed.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(parsed.access_token)
    }
}

#[cfg(test)]
#[path = "gcp_tests.rs"]
mod gcp_tests;
