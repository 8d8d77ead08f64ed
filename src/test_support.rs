// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes of the operator's capabilities for unit tests.
//!
//! - [`FakeStore`] models the API server closely enough for the reconcilers: namespaces
//!   must exist before objects are created in them, finalizers hold deletion open via
//!   `deletionTimestamp`, namespace deletion cascades, replace checks `resourceVersion`
//!   and bumps `generation` on spec changes, create ignores `status`.
//! - [`FakeEngine`] keeps an exclude list and a set of nodes holding shards, and logs
//!   every call so tests can check ordering.
//! - [`RecordingEvents`] keeps every published event.

use crate::context::{Context, OperatorConfig};
use crate::crd::{GeneralConfig, NodePool, OpenSearchCluster, OpenSearchClusterSpec};
use crate::errors::{Error, Result};
use crate::events::EventSink;
use crate::opensearch::{EngineEndpoint, ShardAllocation};
use crate::pki::RcgenIssuer;
use crate::store::{Managed, ObjectStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, ObjectReference};
use kube::runtime::events::EventType;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

type Key = (String, String, String);

/// `apiVersion/kind` of a type, distinguishing the two API groups.
pub fn type_key<K: Managed>() -> String {
    format!("{}/{}", K::api_version(&()), K::kind(&()))
}

fn key<K: Managed>(namespace: &str, name: &str) -> Key {
    (type_key::<K>(), namespace.to_string(), name.to_string())
}

/// RFC 7386 JSON merge patch.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    if let Value::Object(patch_map) = patch {
        if !target.is_object() {
            *target = Value::Object(Map::new());
        }
        if let Value::Object(target_map) = target {
            for (k, v) in patch_map {
                if v.is_null() {
                    target_map.remove(k);
                } else {
                    merge_patch(target_map.entry(k.clone()).or_insert(Value::Null), v);
                }
            }
        }
    } else {
        *target = patch.clone();
    }
}

fn transient(op: &str, kind: &str) -> Error {
    Error::Kube(kube::Error::Api(Box::new(kube::error::ErrorResponse {
        status: Some(kube::core::response::StatusSummary::Failure),
        message: format!("injected {op} failure for {kind}"),
        reason: "InternalError".to_string(),
        code: 500,
        metadata: None,
        details: None,
    })))
}

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<Key, Value>,
    namespaces: BTreeSet<String>,
    creates: BTreeMap<Key, usize>,
    failures: BTreeSet<(String, String)>,
    counter: u64,
}

impl StoreState {
    fn next(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn take_failure(&mut self, op: &str, kind: &str) -> Option<Error> {
        self.failures
            .remove(&(op.to_string(), kind.to_string()))
            .then(|| transient(op, kind))
    }

    /// Drop the object once it is deleting and carries no finalizer.
    fn collect(&mut self, key: &Key) {
        let gone = self.objects.get(key).is_some_and(|obj| {
            let meta = &obj["metadata"];
            let deleting = !meta["deletionTimestamp"].is_null();
            let finalizers = meta["finalizers"].as_array().map_or(0, Vec::len);
            deleting && finalizers == 0
        });
        if gone {
            self.objects.remove(key);
        }
    }

    fn delete_key(&mut self, key: &Key) {
        let Some(obj) = self.objects.get_mut(key) else {
            return;
        };
        if obj["metadata"]["deletionTimestamp"].is_null() {
            obj["metadata"]["deletionTimestamp"] = json!(chrono::Utc::now().to_rfc3339());
        }
        self.collect(key);
    }
}

/// In-memory [`ObjectStore`].
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("store lock")
    }

    /// Seed an object as if a user had created it. Its namespace is created too.
    pub fn insert<K: Managed>(&self, obj: &K) -> K {
        let mut state = self.lock();
        let mut value = serde_json::to_value(obj).expect("serializable");
        let namespace = value["metadata"]["namespace"]
            .as_str()
            .unwrap_or("default")
            .to_string();
        let name = value["metadata"]["name"]
            .as_str()
            .expect("object has a name")
            .to_string();
        let n = state.next();
        if value["metadata"]["uid"].is_null() {
            value["metadata"]["uid"] = json!(format!("uid-{name}-{n}"));
        }
        if value["metadata"]["generation"].is_null() {
            value["metadata"]["generation"] = json!(1);
        }
        value["metadata"]["resourceVersion"] = json!(n.to_string());
        state.namespaces.insert(namespace.clone());
        state
            .objects
            .insert(key::<K>(&namespace, &name), value.clone());
        serde_json::from_value(value).expect("round trip")
    }

    /// Synchronous read for assertions.
    pub fn object<K: Managed>(&self, namespace: &str, name: &str) -> Option<K> {
        self.lock()
            .objects
            .get(&key::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()).expect("round trip"))
    }

    /// Number of creates issued for one object.
    pub fn creates<K: Managed>(&self, namespace: &str, name: &str) -> usize {
        self.lock()
            .creates
            .get(&key::<K>(namespace, name))
            .copied()
            .unwrap_or(0)
    }

    /// Number of creates issued across all objects.
    pub fn total_creates(&self) -> usize {
        self.lock().creates.values().sum()
    }

    /// Names of all objects of a type in a namespace.
    pub fn names<K: Managed>(&self, namespace: &str) -> Vec<String> {
        let kind = type_key::<K>();
        self.lock()
            .objects
            .keys()
            .filter(|(k, ns, _)| *k == kind && ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    /// Every stored object, for whole-store comparisons.
    pub fn snapshot(&self) -> BTreeMap<(String, String, String), Value> {
        self.lock().objects.clone()
    }

    /// Whether a namespace exists.
    pub fn has_namespace(&self, name: &str) -> bool {
        self.lock().namespaces.contains(name)
    }

    /// Make the next `op` (`create`, `replace`, `patch_status`, `patch_merge`, `delete`) on
    /// `kind` fail with a transient error.
    pub fn fail_next(&self, op: &str, kind: &str) {
        self.lock()
            .failures
            .insert((op.to_string(), kind.to_string()));
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get<K: Managed>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.object::<K>(namespace, name))
    }

    async fn create<K: Managed>(&self, namespace: &str, obj: &K) -> Result<K> {
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        if let Some(err) = state.take_failure("create", &kind) {
            return Err(err);
        }
        let mut value = serde_json::to_value(obj)?;
        let name = value["metadata"]["name"].as_str().unwrap_or_default().to_string();
        if !state.namespaces.contains(namespace) {
            return Err(Error::not_found("Namespace", "", namespace));
        }
        let k = key::<K>(namespace, &name);
        if state.objects.contains_key(&k) {
            return Err(Error::conflict(&kind, namespace, &name));
        }
        let n = state.next();
        if let Value::Object(map) = &mut value {
            map.remove("status");
        }
        value["metadata"]["namespace"] = json!(namespace);
        value["metadata"]["uid"] = json!(format!("uid-{name}-{n}"));
        value["metadata"]["resourceVersion"] = json!(n.to_string());
        value["metadata"]["generation"] = json!(1);
        state.objects.insert(k.clone(), value.clone());
        *state.creates.entry(k).or_insert(0) += 1;
        Ok(serde_json::from_value(value)?)
    }

    async fn replace<K: Managed>(&self, namespace: &str, obj: &K) -> Result<K> {
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        if let Some(err) = state.take_failure("replace", &kind) {
            return Err(err);
        }
        let mut value = serde_json::to_value(obj)?;
        let name = value["metadata"]["name"].as_str().unwrap_or_default().to_string();
        let k = key::<K>(namespace, &name);
        let Some(current) = state.objects.get(&k).cloned() else {
            return Err(Error::not_found(&kind, namespace, &name));
        };
        let sent_version = &value["metadata"]["resourceVersion"];
        if !sent_version.is_null() && *sent_version != current["metadata"]["resourceVersion"] {
            return Err(Error::conflict(&kind, namespace, &name));
        }
        let mut generation = current["metadata"]["generation"].as_i64().unwrap_or(1);
        if value["spec"] != current["spec"] {
            generation += 1;
        }
        let n = state.next();
        value["metadata"]["uid"] = current["metadata"]["uid"].clone();
        value["metadata"]["deletionTimestamp"] = current["metadata"]["deletionTimestamp"].clone();
        value["metadata"]["resourceVersion"] = json!(n.to_string());
        value["metadata"]["generation"] = json!(generation);
        if let Value::Object(meta) = &mut value["metadata"] {
            meta.retain(|_, v| !v.is_null());
        }
        match current.get("status") {
            Some(status) => value["status"] = status.clone(),
            None => {
                if let Value::Object(map) = &mut value {
                    map.remove("status");
                }
            }
        }
        state.objects.insert(k.clone(), value.clone());
        state.collect(&k);
        Ok(serde_json::from_value(value)?)
    }

    async fn delete<K: Managed>(&self, namespace: &str, name: &str) -> Result<()> {
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        if let Some(err) = state.take_failure("delete", &kind) {
            return Err(err);
        }
        state.delete_key(&key::<K>(namespace, name));
        Ok(())
    }

    async fn patch_status<K: Managed>(
        &self,
        namespace: &str,
        name: &str,
        status: Value,
    ) -> Result<()> {
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        if let Some(err) = state.take_failure("patch_status", &kind) {
            return Err(err);
        }
        let k = key::<K>(namespace, name);
        let n = state.next();
        let Some(obj) = state.objects.get_mut(&k) else {
            return Err(Error::not_found(&kind, namespace, name));
        };
        merge_patch(&mut obj["status"], &status);
        obj["metadata"]["resourceVersion"] = json!(n.to_string());
        Ok(())
    }

    async fn patch_merge<K: Managed>(
        &self,
        namespace: &str,
        name: &str,
        patch: Value,
    ) -> Result<()> {
        let kind = K::kind(&()).to_string();
        let mut state = self.lock();
        if let Some(err) = state.take_failure("patch_merge", &kind) {
            return Err(err);
        }
        let k = key::<K>(namespace, name);
        let n = state.next();
        let Some(obj) = state.objects.get_mut(&k) else {
            return Err(Error::not_found(&kind, namespace, name));
        };
        let sent_version = &patch["metadata"]["resourceVersion"];
        if !sent_version.is_null() && *sent_version != obj["metadata"]["resourceVersion"] {
            return Err(Error::conflict(&kind, namespace, name));
        }
        let spec_before = obj["spec"].clone();
        merge_patch(obj, &patch);
        if obj["spec"] != spec_before {
            let generation = obj["metadata"]["generation"].as_i64().unwrap_or(1);
            obj["metadata"]["generation"] = json!(generation + 1);
        }
        obj["metadata"]["resourceVersion"] = json!(n.to_string());
        state.collect(&k);
        Ok(())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        Ok(self.has_namespace(name))
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let name = namespace.metadata.name.clone().unwrap_or_default();
        let mut state = self.lock();
        if let Some(err) = state.take_failure("create", "Namespace") {
            return Err(err);
        }
        state.namespaces.insert(name);
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.namespaces.remove(name) {
            return Ok(());
        }
        let keys: Vec<Key> = state
            .objects
            .keys()
            .filter(|(_, ns, _)| ns == name)
            .cloned()
            .collect();
        for k in &keys {
            state.delete_key(k);
        }
        Ok(())
    }
}

/// Scripted search engine.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    excluded: Vec<String>,
    shards_on: BTreeSet<String>,
    calls: Vec<String>,
    fail_append: bool,
    fail_remove: bool,
}

impl FakeEngine {
    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine lock")
    }

    /// Mark whether `node` holds shards.
    pub fn set_shards(&self, node: &str, present: bool) {
        let mut state = self.lock();
        if present {
            state.shards_on.insert(node.to_string());
        } else {
            state.shards_on.remove(node);
        }
    }

    /// Make exclude calls fail.
    pub fn set_fail_append(&self, fail: bool) {
        self.lock().fail_append = fail;
    }

    /// Make remove-exclude calls fail.
    pub fn set_fail_remove(&self, fail: bool) {
        self.lock().fail_remove = fail;
    }

    /// Current exclude list.
    pub fn excluded(&self) -> Vec<String> {
        self.lock().excluded.clone()
    }

    /// Call log: `append_exclude:{node}`, `remove_exclude:{node}`, `has_shards_on:{node}={bool}`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl ShardAllocation for FakeEngine {
    async fn append_exclude(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool> {
        let mut state = self.lock();
        state.calls.push(format!("append_exclude:{node}"));
        if state.fail_append {
            return Err(Error::engine(&endpoint.base_url, "injected append failure"));
        }
        if !state.excluded.iter().any(|n| n == node) {
            state.excluded.push(node.to_string());
        }
        Ok(true)
    }

    async fn remove_exclude(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool> {
        let mut state = self.lock();
        state.calls.push(format!("remove_exclude:{node}"));
        if state.fail_remove {
            return Err(Error::engine(&endpoint.base_url, "injected remove failure"));
        }
        state.excluded.retain(|n| n != node);
        Ok(true)
    }

    async fn has_shards_on(&self, _endpoint: &EngineEndpoint, node: &str) -> Result<bool> {
        let mut state = self.lock();
        let present = state.shards_on.contains(node);
        state.calls.push(format!("has_shards_on:{node}={present}"));
        Ok(present)
    }
}

/// One published event.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent {
    pub warning: bool,
    pub reason: String,
    pub note: String,
}

/// [`EventSink`] that remembers everything.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    /// All events so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().expect("events lock").clone()
    }

    /// Notes of all events so far.
    pub fn notes(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.note).collect()
    }
}

#[async_trait]
impl EventSink for RecordingEvents {
    async fn publish(
        &self,
        _object_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events.lock().expect("events lock").push(RecordedEvent {
            warning: type_ == EventType::Warning,
            reason: reason.to_string(),
            note: note.unwrap_or_default(),
        });
    }
}

/// A context wired to fakes, plus handles on each fake.
pub struct Harness {
    pub ctx: Arc<Context<FakeStore>>,
    pub engine: Arc<FakeEngine>,
    pub events: Arc<RecordingEvents>,
    pub shutdown: watch::Sender<bool>,
}

impl Harness {
    pub fn new() -> Self {
        let engine = Arc::new(FakeEngine::default());
        let events = Arc::new(RecordingEvents::default());
        let (shutdown, rx) = watch::channel(false);
        let ctx = Arc::new(Context::new(
            FakeStore::default(),
            engine.clone(),
            events.clone(),
            Arc::new(RcgenIssuer),
            OperatorConfig::default(),
            rx,
        ));
        Self {
            ctx,
            engine,
            events,
            shutdown,
        }
    }

    pub fn store(&self) -> &FakeStore {
        &self.ctx.store
    }
}

/// Cluster `c1` in namespace `c1`: one `masters` pool of 3 master/data nodes behind
/// `es-svc`, dashboards enabled.
pub fn sample_cluster() -> OpenSearchCluster {
    let mut cluster = OpenSearchCluster::new(
        "c1",
        OpenSearchClusterSpec {
            general: GeneralConfig {
                cluster_name: "c1".to_string(),
                service_name: "es-svc".to_string(),
                version: Some("2.11.1".to_string()),
                ..Default::default()
            },
            node_pools: vec![NodePool {
                component: "masters".to_string(),
                replicas: 3,
                disk_size: Some("30Gi".to_string()),
                roles: vec!["master".to_string(), "data".to_string()],
                ..Default::default()
            }],
            security: None,
            dashboards: Some(crate::crd::DashboardsConfig {
                enable: true,
                ..Default::default()
            }),
        },
    );
    cluster.metadata.namespace = Some("c1".to_string());
    cluster
}

/// The legacy-group twin of [`sample_cluster`].
pub fn sample_legacy_cluster() -> crate::crd::legacy::OpenSearchCluster {
    let spec = serde_json::to_value(&sample_cluster().spec).expect("serializable");
    let mut cluster = crate::crd::legacy::OpenSearchCluster::new(
        "c1",
        serde_json::from_value(spec).expect("same shape in both groups"),
    );
    cluster.metadata.namespace = Some("c1".to_string());
    cluster
}
