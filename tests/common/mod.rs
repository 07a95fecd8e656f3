// Common test utilities: in-memory zone and pod backends.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use privatedns::crd::{PrivateDNS, PrivateDNSSpec};
use privatedns::dns::{ChangeSet, DnsError, RecordSet, RecordType, ZoneApi};
use privatedns::records::PodSource;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory zone backend shared by the integration scenarios.
///
/// Deletions remove the record set keyed by zone+name+type, additions insert
/// it; every apply call is counted so tests can assert on write amplification.
#[derive(Default)]
pub struct MemoryZone {
    records: Mutex<HashMap<(String, String, RecordType), RecordSet>>,
    applies: Mutex<usize>,
}

impl MemoryZone {
    pub fn get(&self, zone: &str, name: &str, record_type: RecordType) -> Option<RecordSet> {
        self.records
            .lock()
            .unwrap()
            .get(&(zone.to_string(), name.to_string(), record_type))
            .cloned()
    }

    pub fn seed(&self, zone: &str, record: RecordSet) {
        self.records.lock().unwrap().insert(
            (zone.to_string(), record.name.clone(), record.record_type),
            record,
        );
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn apply_count(&self) -> usize {
        *self.applies.lock().unwrap()
    }
}

#[async_trait]
impl ZoneApi for MemoryZone {
    async fn lookup(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, DnsError> {
        Ok(self.get(zone, name, record_type))
    }

    async fn apply(&self, zone: &str, change: &ChangeSet) -> Result<(), DnsError> {
        *self.applies.lock().unwrap() += 1;
        let mut records = self.records.lock().unwrap();
        for deletion in &change.deletions {
            records.remove(&(zone.to_string(), deletion.name.clone(), deletion.record_type));
        }
        for addition in &change.additions {
            records.insert(
                (zone.to_string(), addition.name.clone(), addition.record_type),
                addition.clone(),
            );
        }
        Ok(())
    }
}

/// In-memory pod lookup for the address-polling path.
#[derive(Default)]
pub struct MemoryPods {
    pods: Mutex<HashMap<String, Pod>>,
}

impl MemoryPods {
    pub fn put(&self, pod: Pod) {
        self.pods.lock().unwrap().insert(pod.name_any(), pod);
    }
}

#[async_trait]
impl PodSource for MemoryPods {
    async fn get(&self, name: &str) -> anyhow::Result<Option<Pod>> {
        Ok(self.pods.lock().unwrap().get(name).cloned())
    }
}

/// Build a pod in namespace `prod` with an optional owner and address.
pub fn make_pod(name: &str, owner: Option<&str>, address: Option<&str>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("prod".to_string()),
            owner_references: owner.map(|o| {
                vec![OwnerReference {
                    api_version: "apps/v1".to_string(),
                    kind: "StatefulSet".to_string(),
                    name: o.to_string(),
                    uid: "test-uid".to_string(),
                    ..OwnerReference::default()
                }]
            }),
            ..ObjectMeta::default()
        },
        status: Some(PodStatus {
            pod_ip: address.map(String::from),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

/// Build a `PrivateDNS` resource in namespace `prod`.
pub fn make_resource(name: &str, spec: PrivateDNSSpec) -> PrivateDNS {
    let mut resource = PrivateDNS::new(name, spec);
    resource.metadata.namespace = Some("prod".to_string());
    resource
}

pub fn base_spec() -> PrivateDNSSpec {
    PrivateDNSSpec {
        label: "app=pg".to_string(),
        domain: "example.com".to_string(),
        srv_port: None,
        srv_protocol: None,
        pod_timeout: Some("4s".to_string()),
        service: false,
        subdomain: false,
    }
}
