// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Per-resource pod watcher and records manager.
//!
//! Each live `PrivateDNS` resource gets one [`RecordsManager`]. The manager
//! consumes the label-filtered pod event stream for its resource, keeps a
//! snapshot store of the pods it has seen, and translates pod lifecycle
//! transitions into DNS change requests:
//!
//! - pod added with an address: ensure forward A (+ service / SRV / PTR)
//! - pod added without an address: poll for the address up to `pod-timeout`,
//!   then park the pod in the [`PendingTable`]
//! - pod updated while pending: ensure records once an address appears
//! - pod deleted: delete the records built from its last-known address
//!
//! Handlers run sequentially on the manager's event loop; DNS mutations are
//! submitted in pod-event order. `destroy` stops the loop and deletes every
//! record the manager still knows about.

pub mod pending;

use crate::constants::{ADDRESS_POLL_INTERVAL_SECS, DEFAULT_POD_TIMEOUT_SECS};
use crate::crd::PrivateDNS;
use crate::dns::{DnsError, DnsProvider};
use crate::duration::parse_duration;
use crate::metrics;
use crate::naming;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::runtime::{watcher, WatchStreamExt};
use kube::ResourceExt;
use pending::PendingTable;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Resolved per-resource watch parameters.
///
/// Built from a `PrivateDNS` resource after the effective domain has been
/// computed (cluster-identity prefixing happens in the controller) and the
/// timeout string parsed.
#[derive(Clone, Debug)]
pub struct WatchSpec {
    /// Resource name
    pub name: String,
    /// Resource (and pod) namespace
    pub namespace: String,
    /// Pod label selector expression
    pub label: String,
    /// Effective DNS suffix for all records
    pub domain: String,
    /// Maintain the shared-service aggregate A record
    pub service: bool,
    /// SRV owner name, when SRV registration is enabled
    pub srv_name: Option<String>,
    /// How long to wait for a pod address before deferring to the pending
    /// table
    pub pod_timeout: Duration,
}

impl WatchSpec {
    /// Build a watch spec from a resource and its resolved effective domain.
    ///
    /// A malformed `pod-timeout` falls back to the default with a warning; a
    /// half-configured SRV pair disables SRV registration with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource has no namespace.
    pub fn from_resource(resource: &PrivateDNS, effective_domain: String) -> Result<Self> {
        let name = resource.name_any();
        let namespace = resource
            .namespace()
            .context("PrivateDNS resource has no namespace")?;

        let srv_name = match (&resource.spec.srv_port, &resource.spec.srv_protocol) {
            (Some(port), Some(proto)) => {
                Some(naming::srv_owner_name(port, proto, &effective_domain))
            }
            (None, None) => None,
            _ => {
                warn!(
                    resource = %name,
                    "srv-port and srv-protocol must be set together, skipping SRV registration"
                );
                None
            }
        };

        let pod_timeout = match &resource.spec.pod_timeout {
            Some(raw) => parse_duration(raw).unwrap_or_else(|err| {
                warn!(
                    resource = %name,
                    value = %raw,
                    error = %err,
                    "Invalid pod-timeout, using default"
                );
                Duration::from_secs(DEFAULT_POD_TIMEOUT_SECS)
            }),
            None => Duration::from_secs(DEFAULT_POD_TIMEOUT_SECS),
        };

        Ok(Self {
            name,
            namespace,
            label: resource.spec.label.clone(),
            domain: effective_domain,
            service: resource.spec.service,
            srv_name,
            pod_timeout,
        })
    }

    /// Registry key of the owning resource: `<namespace>/<name>`.
    #[must_use]
    pub fn registry_key(&self) -> String {
        naming::registry_key(&self.namespace, &self.name)
    }
}

/// Last-known state of a pod the manager has seen.
#[derive(Clone, Debug)]
pub struct PodSnapshot {
    /// Pod namespace
    pub namespace: String,
    /// Pod name
    pub name: String,
    /// Name of the first owner reference (statefulset/deployment)
    pub owner: String,
    /// Last observed pod address; empty while unassigned
    pub address: String,
}

impl PodSnapshot {
    /// Snapshot a pod. Returns `None` for pods without owner references,
    /// which cannot be named and are not registered.
    #[must_use]
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let owner = naming::pod_owner(pod)?.to_string();
        let address = pod
            .status
            .as_ref()
            .and_then(|status| status.pod_ip.clone())
            .unwrap_or_default();

        Some(Self {
            namespace: pod.namespace().unwrap_or_default(),
            name: pod.name_any(),
            owner,
            address,
        })
    }

    /// Store key for this pod: `<namespace>/<name>`.
    #[must_use]
    pub fn key(&self) -> String {
        naming::registry_key(&self.namespace, &self.name)
    }
}

/// Point lookup of a pod by name, for address polling.
///
/// Implemented by [`ApiPodSource`] in production and by fakes in tests.
#[async_trait]
pub trait PodSource: Send + Sync {
    /// Fetch the pod named `name` in the manager's namespace.
    async fn get(&self, name: &str) -> Result<Option<Pod>>;
}

/// [`PodSource`] backed by the Kubernetes API.
pub struct ApiPodSource {
    api: Api<Pod>,
}

impl ApiPodSource {
    /// Wrap a namespaced pod API.
    #[must_use]
    pub fn new(api: Api<Pod>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PodSource for ApiPodSource {
    async fn get(&self, name: &str) -> Result<Option<Pod>> {
        Ok(self.api.get_opt(name).await?)
    }
}

/// The per-resource worker: watches pods and keeps their DNS records in
/// sync.
///
/// Cheap to clone; clones share the same state and stop signal.
#[derive(Clone)]
pub struct RecordsManager {
    spec: Arc<WatchSpec>,
    provider: Arc<DnsProvider>,
    pod_source: Arc<dyn PodSource>,
    pods: Arc<Mutex<HashMap<String, PodSnapshot>>>,
    pending: Arc<Mutex<PendingTable>>,
    stop: CancellationToken,
}

impl RecordsManager {
    /// Create a manager for one resolved resource spec.
    #[must_use]
    pub fn new(spec: WatchSpec, provider: Arc<DnsProvider>, pod_source: Arc<dyn PodSource>) -> Self {
        Self {
            spec: Arc::new(spec),
            provider,
            pod_source,
            pods: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(PendingTable::new())),
            stop: CancellationToken::new(),
        }
    }

    /// The resolved spec this manager reconciles.
    #[must_use]
    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    /// Begin consuming pod events on a background task.
    ///
    /// The initial list replays an apply event for every currently matching
    /// pod; record creation is idempotent, so the replay converges without
    /// redundant writes.
    pub fn start(&self, api: Api<Pod>) {
        info!(
            resource = %self.spec.registry_key(),
            label = %self.spec.label,
            namespace = %self.spec.namespace,
            "Starting pod watcher"
        );

        let manager = self.clone();
        tokio::spawn(async move { manager.run_watch(api).await });
    }

    /// Signal the event loop to exit at its next quiescent point. No record
    /// cleanup is performed.
    pub fn stop(&self) {
        info!(resource = %self.spec.registry_key(), "Stopping pod watcher");
        self.stop.cancel();
    }

    /// Stop the watcher and delete the records of every pod this manager
    /// still knows about, best effort.
    pub async fn destroy(&self) {
        self.stop();

        let snapshots: Vec<PodSnapshot> = {
            let mut pods = self.pods_lock();
            pods.drain().map(|(_, snapshot)| snapshot).collect()
        };

        info!(
            resource = %self.spec.registry_key(),
            pods = snapshots.len(),
            "Removing all records"
        );

        for snapshot in snapshots {
            if snapshot.address.is_empty() {
                debug!(pod = %snapshot.key(), "Pod never had an address, no records to remove");
                continue;
            }
            if let Err(err) = self.delete_records(&snapshot).await {
                error!(pod = %snapshot.key(), error = %err, "Failed to remove records");
            }
        }

        metrics::PENDING_PODS
            .with_label_values(&[&self.spec.registry_key()])
            .set(0.0);
    }

    async fn run_watch(self, api: Api<Pod>) {
        let config = watcher::Config::default().labels(&self.spec.label);
        let stream = watcher(api, config).default_backoff();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                () = self.stop.cancelled() => {
                    debug!(resource = %self.spec.registry_key(), "Pod watcher cancelled");
                    break;
                }
                event = stream.next() => {
                    match event {
                        Some(Ok(watcher::Event::Init)) => {}
                        Some(Ok(watcher::Event::InitApply(pod) | watcher::Event::Apply(pod))) => {
                            self.on_pod_event(&pod).await;
                        }
                        Some(Ok(watcher::Event::InitDone)) => {
                            debug!(resource = %self.spec.registry_key(), "Initial pod list replayed");
                        }
                        Some(Ok(watcher::Event::Delete(pod))) => {
                            self.on_pod_delete(&pod).await;
                        }
                        Some(Err(err)) => {
                            warn!(
                                resource = %self.spec.registry_key(),
                                error = %err,
                                "Pod watch error, backing off"
                            );
                        }
                        None => {
                            warn!(resource = %self.spec.registry_key(), "Pod watch stream ended");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Dispatch an applied-pod event as an add or an update, depending on
    /// whether this manager has seen the pod before.
    pub async fn on_pod_event(&self, pod: &Pod) {
        let key = naming::registry_key(&pod.namespace().unwrap_or_default(), &pod.name_any());
        let previous = {
            let pods = self.pods_lock();
            pods.get(&key).cloned()
        };

        match previous {
            Some(_) => self.on_pod_update(pod).await,
            None => self.on_pod_add(pod).await,
        }
    }

    /// Handler for a newly observed pod.
    pub async fn on_pod_add(&self, pod: &Pod) {
        debug!(pod = %pod.name_any(), "Pod created");

        let Some(mut snapshot) = PodSnapshot::from_pod(pod) else {
            warn!(pod = %pod.name_any(), "Pod has no owner reference, ignoring");
            return;
        };
        let key = snapshot.key();

        if snapshot.address.is_empty() {
            warn!(pod = %key, "Pod address missing, will try to resolve");
            match self.resolve_address(&snapshot.name).await {
                Some(address) => snapshot.address = address,
                None => {
                    debug!(
                        pod = %key,
                        timeout = ?self.spec.pod_timeout,
                        "Failed to resolve pod address in time, deferring to pending table"
                    );
                    self.mark_pending(&key);
                    self.pods_lock().insert(key, snapshot);
                    return;
                }
            }
        }

        self.pods_lock().insert(key.clone(), snapshot.clone());

        let result = self.ensure_records(&snapshot).await;
        metrics::record_operation("ensure", result.is_ok());
        if let Err(err) = result {
            error!(pod = %key, error = %err, "Failed to ensure records");
        }
    }

    /// Handler for an updated pod. Only pods parked in the pending table are
    /// acted on; address rotation for already-recorded pods is not handled.
    pub async fn on_pod_update(&self, pod: &Pod) {
        let Some(snapshot) = PodSnapshot::from_pod(pod) else {
            return;
        };
        let key = snapshot.key();
        debug!(pod = %key, "Pod updated");

        let was_pending = self.pending_lock().contains(&key);
        if !was_pending || snapshot.address.is_empty() {
            return;
        }

        debug!(pod = %key, address = %snapshot.address, "Resolved a pending record");

        let result = self.ensure_records(&snapshot).await;
        metrics::record_operation("ensure", result.is_ok());
        match result {
            Ok(()) => {
                self.pending_lock().remove(&key);
                self.publish_pending_gauge();
                self.pods_lock().insert(key, snapshot);
            }
            Err(err) => {
                error!(pod = %key, error = %err, "Failed to ensure records for pending pod");
            }
        }
    }

    /// Handler for pod deletion events.
    pub async fn on_pod_delete(&self, pod: &Pod) {
        let key = naming::registry_key(&pod.namespace().unwrap_or_default(), &pod.name_any());
        debug!(pod = %key, "Pod deleted");

        self.pending_lock().remove(&key);
        self.publish_pending_gauge();

        let snapshot = {
            let mut pods = self.pods_lock();
            pods.remove(&key)
        }
        .or_else(|| PodSnapshot::from_pod(pod));

        let Some(snapshot) = snapshot else {
            debug!(pod = %key, "Deleted pod was never registered");
            return;
        };

        if snapshot.address.is_empty() {
            debug!(pod = %key, "Deleted pod had no address, no records to remove");
            return;
        }

        let result = self.delete_records(&snapshot).await;
        metrics::record_operation("delete", result.is_ok());
        if let Err(err) = result {
            error!(pod = %key, error = %err, "Failed to delete records");
        }
    }

    /// Emit one coalesced change request creating all records for a pod.
    pub async fn ensure_records(&self, snapshot: &PodSnapshot) -> Result<(), DnsError> {
        let pod_domain = naming::pod_fqdn(&snapshot.name, &snapshot.owner, &self.spec.domain);
        let service_domain = naming::service_fqdn(&snapshot.owner, &self.spec.domain);

        let mut request = self.provider.new_request();
        request.add_record(&pod_domain, &snapshot.address).await;

        if self.spec.service {
            request.add_to_service(&service_domain, &snapshot.address).await;
        }

        if let Some(srv_name) = &self.spec.srv_name {
            request.add_to_srv(srv_name, &service_domain).await;
        }

        request.submit().await
    }

    /// Emit one coalesced change request deleting all records for a pod.
    pub async fn delete_records(&self, snapshot: &PodSnapshot) -> Result<(), DnsError> {
        let pod_domain = naming::pod_fqdn(&snapshot.name, &snapshot.owner, &self.spec.domain);
        let service_domain = naming::service_fqdn(&snapshot.owner, &self.spec.domain);

        let mut request = self.provider.new_request();
        request.remove_record(&pod_domain, &snapshot.address).await;

        if self.spec.service {
            request
                .remove_from_service(&service_domain, &snapshot.address)
                .await;
        }

        if let Some(srv_name) = &self.spec.srv_name {
            request.remove_from_srv(srv_name, &service_domain).await;
        }

        request.submit().await
    }

    /// Number of pods currently parked in the pending table.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending_lock().len()
    }

    /// Number of pods in the snapshot store.
    #[must_use]
    pub fn known_pods(&self) -> usize {
        self.pods_lock().len()
    }

    fn pods_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PodSnapshot>> {
        self.pods.lock().expect("pod store lock poisoned")
    }

    fn pending_lock(&self) -> std::sync::MutexGuard<'_, PendingTable> {
        self.pending.lock().expect("pending table lock poisoned")
    }

    fn mark_pending(&self, key: &str) {
        self.pending_lock().insert(key);
        self.publish_pending_gauge();
    }

    fn publish_pending_gauge(&self) {
        let len = self.pending_len();
        metrics::PENDING_PODS
            .with_label_values(&[&self.spec.registry_key()])
            .set(len as f64);
    }

    /// Poll the orchestrator for the pod's address, every 2 seconds, for up
    /// to `pod-timeout`. Intentionally serializes this manager; subsequent
    /// pod events queue behind the poll.
    async fn resolve_address(&self, pod_name: &str) -> Option<String> {
        let interval = Duration::from_secs(ADDRESS_POLL_INTERVAL_SECS);
        let deadline = Instant::now() + self.spec.pod_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            tokio::time::sleep(interval.min(remaining)).await;

            match self.pod_source.get(pod_name).await {
                Ok(Some(pod)) => {
                    let address = pod
                        .status
                        .as_ref()
                        .and_then(|status| status.pod_ip.clone())
                        .unwrap_or_default();
                    if !address.is_empty() {
                        debug!(pod = %pod_name, %address, "Pod address resolved");
                        return Some(address);
                    }
                }
                Ok(None) => {
                    debug!(pod = %pod_name, "Pod disappeared while waiting for an address");
                    return None;
                }
                Err(err) => {
                    warn!(pod = %pod_name, error = %err, "Pod lookup failed while polling");
                }
            }
        }
    }
}
