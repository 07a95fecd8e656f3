// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! The resource controller: one pod watcher per live `PrivateDNS` resource.
//!
//! Watches `PrivateDNS` resources across the configured namespace scope and
//! maintains the registry index, a mutex-guarded map from `namespace/name`
//! to the running [`RecordsManager`]. Resource transitions map onto the
//! registry as:
//!
//! - created: start a new manager (insert into the index before launch, so
//!   the index stays authoritative)
//! - updated: destroy the old manager (removing its records) and start a
//!   fresh one; the initial replay rebuilds the record set
//! - deleted: destroy the manager
//!
//! Shutdown stops the resource watch, then stops every manager without
//! touching records, and waits briefly for in-flight work to drain.

use crate::constants::SHUTDOWN_DRAIN_SECS;
use crate::crd::PrivateDNS;
use crate::dns::DnsProvider;
use crate::gcp::ClusterIdentity;
use crate::metrics;
use crate::naming;
use crate::records::{ApiPodSource, RecordsManager, WatchSpec};
use anyhow::{Context, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Compute the effective domain for a resource: the declared domain, or the
/// cluster-identity-prefixed domain for `subdomain: true` resources.
///
/// # Errors
///
/// Returns an error when cluster identity cannot be resolved for a
/// subdomain-scoped resource. This is a misconfiguration and fatal to the
/// process.
pub async fn resolve_effective_domain(
    identity: &dyn ClusterIdentity,
    resource: &PrivateDNS,
) -> Result<String> {
    if !resource.spec.subdomain {
        return Ok(resource.spec.domain.clone());
    }

    let cluster_name = identity
        .cluster_name()
        .await
        .context("Failed to resolve cluster name for subdomain-scoped resource")?;
    let cluster_location = identity
        .cluster_location()
        .await
        .context("Failed to resolve cluster location for subdomain-scoped resource")?;

    Ok(naming::cluster_scoped_domain(
        &cluster_name,
        &cluster_location,
        &resource.spec.domain,
    ))
}

#[derive(Default)]
struct Registry {
    workers: HashMap<String, RecordsManager>,
    resources: HashMap<String, PrivateDNS>,
}

/// Controller that keeps exactly one running pod watcher per live
/// `PrivateDNS` resource.
pub struct Controller {
    client: Client,
    provider: Arc<DnsProvider>,
    identity: Arc<dyn ClusterIdentity>,
    namespace: Option<String>,
    registry: Mutex<Registry>,
}

impl Controller {
    /// Create a controller.
    ///
    /// `namespace` limits the resource watch to one namespace; `None` watches
    /// cluster-wide.
    #[must_use]
    pub fn new(
        client: Client,
        provider: Arc<DnsProvider>,
        identity: Arc<dyn ClusterIdentity>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            client,
            provider,
            identity,
            namespace,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Number of running pod watchers.
    pub async fn worker_count(&self) -> usize {
        self.registry.lock().await.workers.len()
    }

    /// Consume `PrivateDNS` events until `shutdown` fires, then stop all
    /// workers.
    ///
    /// # Errors
    ///
    /// Returns an error on fatal misconfiguration (unresolvable cluster
    /// identity for a subdomain-scoped resource).
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let api: Api<PrivateDNS> = match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };

        info!(
            namespace = self.namespace.as_deref().unwrap_or("(all)"),
            "Watching PrivateDNS resources"
        );

        let stream = watcher(api, watcher::Config::default()).default_backoff();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping resource watch");
                    break;
                }
                event = stream.next() => {
                    match event {
                        Some(Ok(watcher::Event::Init)) => {}
                        Some(Ok(watcher::Event::InitApply(resource) | watcher::Event::Apply(resource))) => {
                            self.on_resource_apply(resource).await?;
                        }
                        Some(Ok(watcher::Event::InitDone)) => {
                            debug!("Initial PrivateDNS list replayed");
                        }
                        Some(Ok(watcher::Event::Delete(resource))) => {
                            self.on_resource_delete(&resource).await;
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "PrivateDNS watch error, backing off");
                        }
                        None => {
                            warn!("PrivateDNS watch stream ended");
                            break;
                        }
                    }
                }
            }
        }

        self.stop_workers().await;
        Ok(())
    }

    /// Handle an applied resource: dispatch to add, update or ignore,
    /// depending on what the registry already holds for its key.
    ///
    /// # Errors
    ///
    /// Returns an error on fatal misconfiguration; all other failures are
    /// logged and skipped.
    pub async fn on_resource_apply(&self, resource: PrivateDNS) -> Result<()> {
        let Some(key) = resource_key(&resource) else {
            warn!(resource = %resource.name_any(), "PrivateDNS resource has no namespace, ignoring");
            return Ok(());
        };

        let mut registry = self.registry.lock().await;

        let known = registry.resources.get(&key).map(|existing| existing.spec == resource.spec);

        match known {
            Some(true) => {
                debug!(resource = %key, "PrivateDNS unchanged, ignoring");
            }
            Some(false) => {
                info!(resource = %key, "PrivateDNS updated");
                metrics::record_resource_event("update");

                // Destroy + recreate; no differential reconciliation between
                // the old and new specs.
                registry.resources.remove(&key);
                match registry.workers.remove(&key) {
                    Some(manager) => {
                        manager.destroy().await;
                        metrics::WATCHERS_ACTIVE.dec();
                    }
                    None => {
                        error!(
                            resource = %key,
                            "Pod watcher for updated resource did not exist, broken state"
                        );
                    }
                }

                self.start_worker(&mut registry, key, resource).await?;
            }
            None => {
                info!(resource = %key, "PrivateDNS created");
                metrics::record_resource_event("add");
                self.start_worker(&mut registry, key, resource).await?;
            }
        }

        Ok(())
    }

    /// Handle a deleted resource: destroy its worker, removing every record
    /// the worker still knows about.
    pub async fn on_resource_delete(&self, resource: &PrivateDNS) {
        let Some(key) = resource_key(resource) else {
            return;
        };
        info!(resource = %key, "PrivateDNS deleted");
        metrics::record_resource_event("delete");

        let mut registry = self.registry.lock().await;
        registry.resources.remove(&key);

        match registry.workers.remove(&key) {
            Some(manager) => {
                manager.destroy().await;
                metrics::WATCHERS_ACTIVE.dec();
            }
            None => {
                error!(resource = %key, "Pod watcher for deleted resource did not exist");
            }
        }
    }

    async fn start_worker(
        &self,
        registry: &mut Registry,
        key: String,
        resource: PrivateDNS,
    ) -> Result<()> {
        if registry.workers.contains_key(&key) {
            error!(resource = %key, "Pod watcher already exists, doing nothing");
            return Ok(());
        }

        let effective_domain = resolve_effective_domain(self.identity.as_ref(), &resource).await?;

        let spec = match WatchSpec::from_resource(&resource, effective_domain) {
            Ok(spec) => spec,
            Err(err) => {
                error!(resource = %key, error = %err, "Invalid PrivateDNS resource, skipping");
                return Ok(());
            }
        };

        let api: Api<Pod> = Api::namespaced(self.client.clone(), &spec.namespace);
        let manager = RecordsManager::new(
            spec,
            self.provider.clone(),
            Arc::new(ApiPodSource::new(api.clone())),
        );

        // Insert before launching so the index is authoritative.
        registry.workers.insert(key.clone(), manager.clone());
        registry.resources.insert(key, resource);
        manager.start(api);
        metrics::WATCHERS_ACTIVE.inc();

        Ok(())
    }

    /// Stop every worker without deleting records, then wait briefly for
    /// in-flight work.
    async fn stop_workers(&self) {
        let registry = self.registry.lock().await;
        let count = registry.workers.len();
        if count > 0 {
            info!(workers = count, "Stopping pod watchers");
            for manager in registry.workers.values() {
                manager.stop();
            }
        }
        drop(registry);

        tokio::time::sleep(Duration::from_secs(SHUTDOWN_DRAIN_SECS)).await;
        info!("Private DNS controller stopped");
    }
}

fn resource_key(resource: &PrivateDNS) -> Option<String> {
    let namespace = resource.namespace()?;
    Some(naming::registry_key(&namespace, &resource.name_any()))
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
