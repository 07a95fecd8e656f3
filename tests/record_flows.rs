// End-to-end record flow scenarios driven against in-memory backends:
// a records manager per resource, fed synthetic pod events, asserting on
// the resulting zone contents.

mod common;

use common::{base_spec, make_pod, make_resource, MemoryPods, MemoryZone};
use privatedns::crd::PrivateDNSSpec;
use privatedns::dns::{DnsProvider, RecordSet, RecordType};
use privatedns::records::{RecordsManager, WatchSpec};
use std::sync::Arc;

const ZONE: &str = "private-zone";
const REVERSE: &str = "reverse-zone";

struct Scenario {
    zone: Arc<MemoryZone>,
    pods: Arc<MemoryPods>,
    manager: RecordsManager,
}

fn scenario(spec: PrivateDNSSpec, reverse: bool) -> Scenario {
    let zone = Arc::new(MemoryZone::default());
    let pods = Arc::new(MemoryPods::default());
    let provider = Arc::new(DnsProvider::new(
        zone.clone(),
        ZONE.to_string(),
        reverse.then(|| REVERSE.to_string()),
    ));
    let resource = make_resource("db", spec);
    let watch_spec = WatchSpec::from_resource(&resource, resource.spec.domain.clone()).unwrap();
    let manager = RecordsManager::new(watch_spec, provider, pods.clone());

    Scenario { zone, pods, manager }
}

#[tokio::test]
async fn scenario_pod_add_creates_forward_and_service_records() {
    let mut spec = base_spec();
    spec.service = true;
    let s = scenario(spec, false);

    s.manager
        .on_pod_event(&make_pod("db-0", Some("db"), Some("10.0.0.5")))
        .await;

    assert_eq!(
        s.zone
            .get(ZONE, "db-0.db.example.com.", RecordType::A)
            .unwrap()
            .rrdatas,
        vec!["10.0.0.5"]
    );
    assert_eq!(
        s.zone
            .get(ZONE, "db.example.com.", RecordType::A)
            .unwrap()
            .rrdatas,
        vec!["10.0.0.5"]
    );
}

#[tokio::test]
async fn scenario_second_pod_extends_the_aggregate() {
    let mut spec = base_spec();
    spec.service = true;
    let s = scenario(spec, false);

    s.manager
        .on_pod_event(&make_pod("db-0", Some("db"), Some("10.0.0.5")))
        .await;
    s.manager
        .on_pod_event(&make_pod("db-1", Some("db"), Some("10.0.0.6")))
        .await;

    assert_eq!(
        s.zone
            .get(ZONE, "db-1.db.example.com.", RecordType::A)
            .unwrap()
            .rrdatas,
        vec!["10.0.0.6"]
    );
    // The aggregate is rewritten with the new address first.
    assert_eq!(
        s.zone
            .get(ZONE, "db.example.com.", RecordType::A)
            .unwrap()
            .rrdatas,
        vec!["10.0.0.6", "10.0.0.5"]
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_pending_pod_resolves_on_update() {
    let s = scenario(base_spec(), false);
    // The orchestrator has no address for the pod yet either.
    s.pods.put(make_pod("db-2", Some("db"), None));

    // Add blocks for the configured timeout, then parks the pod.
    s.manager
        .on_pod_event(&make_pod("db-2", Some("db"), None))
        .await;
    assert_eq!(s.manager.pending_len(), 1);
    assert_eq!(s.zone.apply_count(), 0);

    // Ten (simulated) seconds later the update event carries the address.
    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
    s.manager
        .on_pod_event(&make_pod("db-2", Some("db"), Some("10.0.0.7")))
        .await;

    assert_eq!(s.manager.pending_len(), 0);
    assert_eq!(
        s.zone
            .get(ZONE, "db-2.db.example.com.", RecordType::A)
            .unwrap()
            .rrdatas,
        vec!["10.0.0.7"]
    );
}

#[tokio::test]
async fn scenario_srv_resource_registers_service_locator() {
    let mut spec = base_spec();
    spec.srv_port = Some("5432".to_string());
    spec.srv_protocol = Some("tcp".to_string());
    let s = scenario(spec, false);

    s.manager
        .on_pod_event(&make_pod("db-0", Some("db"), Some("10.0.0.5")))
        .await;

    assert_eq!(
        s.zone
            .get(ZONE, "_5432._tcp.example.com.", RecordType::Srv)
            .unwrap()
            .rrdatas,
        vec!["db.example.com"]
    );
}

#[tokio::test]
async fn scenario_destroy_removes_all_records_for_known_pods() {
    let mut spec = base_spec();
    spec.service = true;
    spec.srv_port = Some("5432".to_string());
    spec.srv_protocol = Some("tcp".to_string());
    let s = scenario(spec, false);

    s.manager
        .on_pod_event(&make_pod("db-0", Some("db"), Some("10.0.0.5")))
        .await;
    s.manager
        .on_pod_event(&make_pod("db-1", Some("db"), Some("10.0.0.6")))
        .await;
    assert!(s.zone.record_count() > 0);

    // Resource deletion destroys the worker, which deletes every record it
    // still knows about.
    s.manager.destroy().await;

    assert_eq!(s.zone.record_count(), 0);
    assert_eq!(s.manager.known_pods(), 0);
}

#[tokio::test]
async fn scenario_replay_after_recreate_rebuilds_records_without_extra_writes() {
    // A resource update destroys the old worker and starts a new one; the
    // initial replay rebuilds the full record set idempotently.
    let mut spec = base_spec();
    spec.service = true;
    let s = scenario(spec.clone(), false);

    let pod = make_pod("db-0", Some("db"), Some("10.0.0.5"));
    s.manager.on_pod_event(&pod).await;
    s.manager.destroy().await;
    assert_eq!(s.zone.record_count(), 0);

    // New worker for the updated resource, same zone backend.
    let resource = make_resource("db", {
        let mut updated = spec;
        updated.srv_port = Some("6379".to_string());
        updated.srv_protocol = Some("tcp".to_string());
        updated
    });
    let watch_spec = WatchSpec::from_resource(&resource, resource.spec.domain.clone()).unwrap();
    let provider = Arc::new(DnsProvider::new(s.zone.clone(), ZONE.to_string(), None));
    let recreated = RecordsManager::new(watch_spec, provider, s.pods.clone());

    recreated.on_pod_event(&pod).await;

    assert!(s.zone.get(ZONE, "db-0.db.example.com.", RecordType::A).is_some());
    assert!(s.zone.get(ZONE, "db.example.com.", RecordType::A).is_some());
    assert_eq!(
        s.zone
            .get(ZONE, "_6379._tcp.example.com.", RecordType::Srv)
            .unwrap()
            .rrdatas,
        vec!["db.example.com"]
    );

    // Replaying the same pod again converges with zero additional writes.
    let writes = s.zone.apply_count();
    recreated.on_pod_event(&pod).await;
    assert_eq!(s.zone.apply_count(), writes);
}

#[tokio::test]
async fn scenario_reverse_zone_tracks_pod_lifecycle() {
    let s = scenario(base_spec(), true);
    let pod = make_pod("db-0", Some("db"), Some("10.0.0.5"));

    s.manager.on_pod_event(&pod).await;
    assert_eq!(
        s.zone
            .get(REVERSE, "10.0.0.5.in-addr.arpa.", RecordType::Ptr)
            .unwrap()
            .rrdatas,
        vec!["db-0.db.example.com"]
    );

    s.manager.on_pod_delete(&pod).await;
    assert!(s
        .zone
        .get(REVERSE, "10.0.0.5.in-addr.arpa.", RecordType::Ptr)
        .is_none());
}

#[tokio::test]
async fn scenario_drifted_zone_is_not_clobbered_on_delete() {
    let s = scenario(base_spec(), false);

    // Another writer replaced the record after this pod registered.
    s.manager
        .on_pod_event(&make_pod("db-0", Some("db"), Some("10.0.0.5")))
        .await;
    s.zone.seed(ZONE, RecordSet::a("db-0.db.example.com", "10.9.9.9"));

    s.manager
        .on_pod_delete(&make_pod("db-0", Some("db"), Some("10.0.0.5")))
        .await;

    // The foreign record survives.
    assert_eq!(
        s.zone
            .get(ZONE, "db-0.db.example.com.", RecordType::A)
            .unwrap()
            .rrdatas,
        vec!["10.9.9.9"]
    );
}
