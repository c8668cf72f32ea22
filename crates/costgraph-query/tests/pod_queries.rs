use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use costgraph_config::PricingConfig;
use costgraph_core::{BillingWindow, FixedClock, SECONDS_PER_HOUR, Target};
use costgraph_query::{PodQueries, QueryError};
use costgraph_store::{GraphStore, MemoryGraphStore, Query, StoreError, Uid, format_uid};
use serde_json::{Value, json};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

struct Cluster {
    store: MemoryGraphStore,
    web: Uid,
    client: Uid,
    batch: Uid,
    old: Uid,
}

fn cluster() -> Cluster {
    let mut store = MemoryGraphStore::new(now());

    let web = store.insert_node(json!({
        "isPod": true,
        "name": "web-1",
        "type": "pod",
        "startTime": "2026-10-19T07:00:00Z",
        "cpuRequest": 2.0,
        "memoryRequest": 4.0,
        "storageRequest": 10.0,
        "cpuPrice": 0.5
    }));
    let client = store.insert_node(json!({
        "isPod": true,
        "name": "client-1",
        "type": "pod",
        "startTime": "2026-10-18T12:00:00Z"
    }));
    let batch = store.insert_node(json!({
        "isPod": true,
        "name": "batch-1",
        "type": "pod",
        "startTime": "2026-08-01T00:00:00Z",
        "cpuRequest": 1.0,
        "count": 3
    }));
    let old = store.insert_node(json!({
        "isPod": true,
        "name": "old-1",
        "type": "pod",
        "startTime": "2026-10-02T00:00:00Z",
        "endTime": "2026-10-03T00:00:00Z",
        "cpuRequest": 1.0
    }));

    let nginx = store.insert_node(json!({
        "isContainer": true,
        "name": "nginx",
        "type": "container",
        "startTime": "2026-10-19T07:00:00Z",
        "cpuRequest": 1.5,
        "memoryRequest": 3.0
    }));
    let sidecar = store.insert_node(json!({
        "isContainer": true,
        "name": "sidecar",
        "type": "container",
        "startTime": "2026-10-19T09:00:00Z",
        "endTime": "2026-10-19T11:00:00Z",
        "cpuRequest": 0.5,
        "memoryRequest": 1.0
    }));
    store.link(nginx, "pod", web);
    store.link(sidecar, "pod", web);

    let service = store.insert_node(json!({"isService": true, "name": "web-svc"}));
    store.link(service, "pod", web);

    store.link(web, "pod", batch);
    store.link(client, "pod", web);

    let labels = [
        ("tier", "frontend"),
        ("tier", "backend"),
        ("env", "prod"),
        ("env", "dev"),
    ]
    .map(|(key, value)| store.insert_node(json!({"isLabel": true, "key": key, "value": value})));
    let [frontend, backend, prod, dev] = labels;
    store.link(web, "label", frontend);
    store.link(web, "label", prod);
    store.link(client, "label", prod);
    store.link(batch, "label", backend);
    store.link(old, "label", dev);

    Cluster {
        store,
        web,
        client,
        batch,
        old,
    }
}

fn queries(store: &MemoryGraphStore) -> PodQueries<&MemoryGraphStore> {
    PodQueries::new(store, PricingConfig::default()).with_clock(FixedClock(now()))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn hierarchy_returns_pod_with_container_children() {
    let cluster = cluster();

    let view = queries(&cluster.store).hierarchy(&Target::parse("web-1"));

    assert_eq!(view.data.name, "web-1");
    assert_eq!(view.data.kind, "pod");
    let children = view
        .data
        .children
        .iter()
        .map(|child| (child.name.as_str(), child.kind.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(children, vec![("nginx", "container"), ("sidecar", "container")]);
    assert_eq!(view.data.total_cost(), 0.0);
}

#[test]
fn wildcard_hierarchy_requests_never_reach_the_store() {
    let cluster = cluster();
    let queries = queries(&cluster.store);

    for target in ["", "all"] {
        assert!(queries.hierarchy(&Target::parse(target)).is_empty());
        assert!(queries.cost_hierarchy(&Target::parse(target)).is_empty());
    }

    assert_eq!(cluster.store.query_count(), 0);
}

#[test]
fn cost_hierarchy_prorates_each_level_with_resolved_prices() {
    let cluster = cluster();
    let defaults = PricingConfig::default();

    let view = queries(&cluster.store).cost_hierarchy(&Target::parse("web-1"));
    let pod = &view.data;

    assert_eq!(cluster.store.query_count(), 2);
    assert_eq!(pod.cpu, 2.0);
    assert_eq!(pod.storage, 10.0);
    assert_close(pod.cpu_cost, 2.0 * 5.0 * 0.5);
    assert_close(pod.memory_cost, 4.0 * 5.0 * defaults.memory_per_gb_hour);
    assert_close(pod.storage_cost, 10.0 * 5.0 * defaults.storage_per_gb_hour);

    let nginx = &pod.children[0];
    assert_close(nginx.cpu_cost, 1.5 * 5.0 * 0.5);
    assert_close(nginx.memory_cost, 3.0 * 5.0 * defaults.memory_per_gb_hour);
    assert_eq!(nginx.storage_cost, 0.0);

    let sidecar = &pod.children[1];
    assert_close(sidecar.cpu_cost, 0.5 * 2.0 * 0.5);
    assert_close(sidecar.memory_cost, 1.0 * 2.0 * defaults.memory_per_gb_hour);
}

#[test]
fn cost_hierarchy_clips_long_running_pods_to_the_billing_window() {
    let cluster = cluster();
    let window = BillingWindow::current_month(now());

    let view = queries(&cluster.store).cost_hierarchy(&Target::parse("batch-1"));

    let hours = window.elapsed_seconds() / SECONDS_PER_HOUR;
    assert_eq!(hours, 444.0);
    assert_close(view.data.cpu_cost, hours * PricingConfig::default().cpu_per_core_hour);
}

#[test]
fn cost_hierarchy_matches_reference_proration_for_terminated_pods() {
    let cluster = cluster();
    let window = BillingWindow::current_month(now());
    let started_at = Utc
        .with_ymd_and_hms(2026, 10, 2, 0, 0, 0)
        .single()
        .expect("valid timestamp");
    let ended_at = Utc
        .with_ymd_and_hms(2026, 10, 3, 0, 0, 0)
        .single()
        .expect("valid timestamp");

    let view = queries(&cluster.store).cost_hierarchy(&Target::parse("old-1"));

    let hours = window.prorated_hours(started_at, Some(ended_at));
    assert_eq!(hours, 24.0);
    assert!(hours < window.prorated_hours(started_at, None));
    assert_close(view.data.cpu_cost, hours * PricingConfig::default().cpu_per_core_hour);
}

#[test]
fn interactions_pass_raw_payload_through() -> Result<(), Box<dyn std::error::Error>> {
    let cluster = cluster();
    let queries = queries(&cluster.store);

    let raw = queries
        .interactions(&Target::parse("web-1"), false)
        .ok_or("interactions should succeed")?;
    let payload: Value = serde_json::from_slice(&raw)?;
    assert_eq!(
        payload,
        json!({"pods": [{
            "name": "web-1",
            "outbound": [{"name": "batch-1"}],
            "inbound": [{"name": "client-1"}]
        }]})
    );

    let names = |raw: Vec<u8>| -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let payload: Value = serde_json::from_slice(&raw)?;
        Ok(payload["pods"]
            .as_array()
            .map(|pods| {
                pods.iter()
                    .filter_map(|pod| pod["name"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default())
    };

    let orphans = queries
        .interactions(&Target::All, true)
        .ok_or("orphan interactions should succeed")?;
    assert_eq!(names(orphans)?, vec!["batch-1", "old-1"]);

    let connected = queries
        .interactions(&Target::All, false)
        .ok_or("connected interactions should succeed")?;
    assert_eq!(names(connected)?, vec!["web-1", "client-1"]);

    Ok(())
}

#[test]
fn label_filter_matches_any_pair_and_dedupes_multi_path_pods() -> Result<(), QueryError> {
    let cluster = cluster();
    let labels = BTreeMap::from([
        (
            "tier".to_owned(),
            vec!["frontend".to_owned(), "backend".to_owned()],
        ),
        ("env".to_owned(), vec!["prod".to_owned()]),
    ]);

    let uids = queries(&cluster.store).uids_by_labels(&labels)?;

    assert_eq!(
        uids,
        vec![
            format_uid(cluster.web),
            format_uid(cluster.client),
            format_uid(cluster.batch),
        ]
    );
    assert!(!uids.contains(&format_uid(cluster.old)));
    Ok(())
}

#[test]
fn empty_label_filter_is_a_usage_error_without_store_call() {
    let cluster = cluster();

    let err = queries(&cluster.store)
        .uids_by_labels(&BTreeMap::new())
        .expect_err("empty filter must fail");

    assert!(matches!(err, QueryError::Usage(_)));
    assert_eq!(cluster.store.query_count(), 0);
}

#[test]
fn live_pods_never_include_terminated_pods() -> Result<(), QueryError> {
    let cluster = cluster();

    let pods = queries(&cluster.store).live_pods()?;

    let names = pods.iter().map(|pod| pod.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["web-1", "client-1", "batch-1"]);
    assert!(pods.iter().all(|pod| pod.is_live()));

    let web = &pods[0];
    assert_eq!(web.interactions.len(), 1);
    assert_eq!(web.interactions[0].name, "batch-1");
    assert_eq!(web.interactions[0].count, 3.0);
    assert_eq!(web.services[0].name, "web-svc");
    Ok(())
}

#[test]
fn store_failures_degrade_or_propagate_per_operation() {
    let mut cluster = cluster();
    cluster.store.fail_with("connection refused");
    let queries = queries(&cluster.store);
    let labels = BTreeMap::from([("env".to_owned(), vec!["prod".to_owned()])]);

    assert!(queries.interactions(&Target::All, false).is_none());
    assert!(queries.hierarchy(&Target::parse("web-1")).is_empty());
    assert!(queries.cost_hierarchy(&Target::parse("web-1")).is_empty());
    assert!(matches!(
        queries.uids_by_labels(&labels),
        Err(QueryError::Store(_))
    ));
    assert!(matches!(queries.live_pods(), Err(QueryError::Store(_))));
}

#[test]
fn unknown_pod_yields_empty_hierarchy() {
    let cluster = cluster();

    let view = queries(&cluster.store).hierarchy(&Target::parse("ghost"));

    assert!(view.is_empty());
    assert_eq!(cluster.store.query_count(), 1);
}

/// Answers every request with the same payload.
struct CannedStore(Vec<u8>);

impl GraphStore for CannedStore {
    fn query_raw(&self, _query: &Query) -> Result<Vec<u8>, StoreError> {
        Ok(self.0.clone())
    }
}

#[test]
fn label_uids_collapse_repeats_in_first_seen_order() -> Result<(), QueryError> {
    let payload = json!({"pods": [
        {"uid": "0x2", "name": "web-1"},
        {"uid": "0x1", "name": "client-1"},
        {"uid": "0x2", "name": "web-1"},
        {"uid": "0x3", "name": "batch-1"},
        {"uid": "0x1", "name": "client-1"}
    ]});
    let store = CannedStore(serde_json::to_vec(&payload).map_err(QueryError::Decode)?);
    let labels = BTreeMap::from([("env".to_owned(), vec!["prod".to_owned()])]);

    let uids = PodQueries::new(store, PricingConfig::default()).uids_by_labels(&labels)?;

    assert_eq!(uids, vec!["0x2", "0x1", "0x3"]);
    Ok(())
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        let bytes = self.0.lock().expect("log buffer lock").clone();
        String::from_utf8(bytes).expect("utf-8 log output")
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn usage_errors_are_logged_before_any_store_call() {
    let cluster = cluster();
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let queries = queries(&cluster.store);
        assert!(matches!(
            queries.uids_by_labels(&BTreeMap::new()),
            Err(QueryError::Usage(_))
        ));
        assert!(queries.hierarchy(&Target::All).is_empty());
    });

    let text = logs.text();
    assert!(text.contains(r#"operation="uids_by_labels""#), "{text}");
    assert!(text.contains(r#"operation="hierarchy""#), "{text}");
    assert_eq!(text.matches("ERROR").count(), 2, "{text}");
    assert_eq!(cluster.store.query_count(), 0);
}
