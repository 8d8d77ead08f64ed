// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for OpenSearch management.
//!
//! This module defines the Kubernetes Custom Resource Definitions served under the
//! `opensearch.org/v1` API group. The [`legacy`] submodule serves structurally identical
//! kinds under `opensearch.opster.io/v1` so existing users keep working while they move
//! to the new group.
//!
//! # Resource Types
//!
//! ## Infrastructure
//!
//! - [`OpenSearchCluster`] - Declares the shape of an engine cluster
//!
//! ## Security plugin objects
//!
//! - [`OpensearchUser`], [`OpensearchRole`], [`OpensearchTenant`], [`OpensearchActionGroup`]
//!
//! ## Snapshots
//!
//! - [`OpensearchSnapshotPolicy`]
//!
//! # Example: Declaring a cluster
//!
//! ```rust,no_run
//! use opensearch_operator::crd::{GeneralConfig, NodePool, OpenSearchClusterSpec};
//!
//! let spec = OpenSearchClusterSpec {
//!     general: GeneralConfig {
//!         cluster_name: "logs".to_string(),
//!         service_name: "logs-svc".to_string(),
//!         ..Default::default()
//!     },
//!     node_pools: vec![NodePool {
//!         component: "masters".to_string(),
//!         replicas: 3,
//!         roles: vec!["master".to_string(), "data".to_string()],
//!         ..Default::default()
//!     }],
//!     security: None,
//!     dashboards: None,
//! };
//! ```

pub mod legacy;

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node roles the engine recognises. Anything else in a pool's role list is ignored.
pub const RECOGNISED_ROLES: [&str; 3] = ["master", "data", "ingest"];

/// Distribution of the engine to run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// `OpenSearch` distribution
    #[default]
    Opensearch,
    /// Open Distro for Elasticsearch
    Opendistro,
}

/// Cluster-wide settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneralConfig {
    /// Name of the engine cluster. Immutable once set.
    #[schemars(extend("x-kubernetes-validations" = [
        { "rule": "self == oldSelf", "message": "clusterName is immutable" }
    ]))]
    pub cluster_name: String,

    /// Name of the client-facing `Service`. Per-pool headless services and the
    /// dashboards service are derived from it.
    pub service_name: String,

    /// Engine version (image tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// REST port. Defaults to 9200.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<i32>,

    /// Distribution to run. Defaults to `opensearch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,

    /// Full image reference overriding the vendor/version derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Run a privileged init container that raises `vm.max_map_count` on the node.
    #[serde(default, rename = "setVMMaxMapCount")]
    pub set_vm_max_map_count: bool,
}

/// Where a node keeps its data directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Persistent volume claim per pod (the default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc: Option<PvcSource>,

    /// Ephemeral storage; data is lost when the pod is rescheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirSource>,

    /// A directory on the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<HostPathSource>,
}

/// Claim template parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PvcSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_modes: Option<Vec<String>>,
}

/// Ephemeral storage parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmptyDirSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
}

/// Host directory parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostPathSource {
    pub path: String,
}

/// One homogeneous group of engine nodes, rendered as one `StatefulSet`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    /// Unique name of the pool within the cluster.
    pub component: String,

    /// Desired number of nodes.
    #[schemars(range(min = 0))]
    pub replicas: i32,

    /// Size of each node's data volume (e.g. `30Gi`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<String>,

    /// Subset of `master`, `data`, `ingest`.
    pub roles: Vec<String>,

    /// JVM flags; a 512M heap is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm: Option<String>,

    /// Container resources for the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Data directory backing. Defaults to a persistent volume claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceConfig>,
}

impl NodePool {
    /// Roles of this pool filtered to the set the engine recognises.
    #[must_use]
    pub fn recognised_roles(&self) -> Vec<&str> {
        self.roles
            .iter()
            .map(String::as_str)
            .filter(|role| RECOGNISED_ROLES.contains(role))
            .collect()
    }

    /// Whether the pool carries the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// TLS settings for one interface (`transport` or `http`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsInterfaceConfig {
    /// Let the operator mint a CA and node certificate.
    #[serde(default)]
    pub generate: bool,

    /// Name of a user-provided secret with `tls.crt`/`tls.key`/`ca.crt`.
    /// Recognised but not supported yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Name of a user-provided CA secret. Recognised but not supported yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_secret: Option<String>,
}

/// TLS settings for both engine interfaces.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TlsInterfaceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<TlsInterfaceConfig>,
}

impl TlsConfig {
    /// Look up an interface block by its name.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&TlsInterfaceConfig> {
        match name {
            "transport" => self.transport.as_ref(),
            "http" => self.http.as_ref(),
            _ => None,
        }
    }
}

/// Security plugin settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

/// OpenSearch Dashboards settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardsConfig {
    /// Deploy dashboards alongside the cluster.
    #[serde(default)]
    pub enable: bool,

    /// Dashboards version; defaults to the cluster version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number of dashboards pods. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Coarse lifecycle phase of a cluster.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClusterPhase {
    Pending,
    Running,
    Error,
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterPhase::Pending => write!(f, "PENDING"),
            ClusterPhase::Running => write!(f, "RUNNING"),
            ClusterPhase::Error => write!(f, "ERROR"),
        }
    }
}

/// One per-facet status row.
///
/// The scaler keys its per-pool progress by `component = "Scaler"` and
/// `description = "Group-{index}"`, with the protocol state in `status` and the pod the
/// state applies to in `node`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    pub component: String,
    #[serde(rename = "status")]
    pub state: String,
    pub description: String,

    /// Node a multi-pass transition is acting on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl ComponentStatus {
    #[must_use]
    pub fn new(component: &str, state: &str, description: &str) -> Self {
        Self {
            component: component.to_string(),
            state: state.to_string(),
            description: description.to_string(),
            node: None,
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: &str) -> Self {
        self.node = Some(node.to_string());
        self
    }
}

/// `OpenSearchCluster` status
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ClusterPhase>,

    #[serde(default)]
    pub components_status: Vec<ComponentStatus>,

    /// Generation the controller last acted on when it entered ERROR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Cluster name the workload was deployed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
}

/// `OpenSearchCluster` declares the desired shape of an engine cluster.
///
/// # Example
///
/// ```yaml
/// apiVersion: opensearch.org/v1
/// kind: OpenSearchCluster
/// metadata:
///   name: c1
///   namespace: c1
/// spec:
///   general:
///     clusterName: c1
///     serviceName: es-svc
///     version: 2.11.1
///   nodePools:
///     - component: masters
///       replicas: 3
///       roles: [master, data]
///   dashboards:
///     enable: true
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.org",
    version = "v1",
    kind = "OpenSearchCluster",
    namespaced,
    shortname = "os",
    doc = "OpenSearchCluster declares an OpenSearch cluster: version, node pools, TLS and dashboards."
)]
#[kube(status = "ClusterStatus")]
#[kube(printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#)]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchClusterSpec {
    pub general: GeneralConfig,
    pub node_pools: Vec<NodePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<DashboardsConfig>,
}

impl OpenSearchClusterSpec {
    /// Effective engine version.
    #[must_use]
    pub fn version(&self) -> &str {
        self.general
            .version
            .as_deref()
            .unwrap_or(crate::constants::DEFAULT_OPENSEARCH_VERSION)
    }

    /// Effective REST port.
    #[must_use]
    pub fn http_port(&self) -> i32 {
        self.general
            .http_port
            .unwrap_or(crate::constants::DEFAULT_HTTP_PORT)
    }

    /// TLS block if one was declared.
    #[must_use]
    pub fn tls(&self) -> Option<&TlsConfig> {
        self.security.as_ref().and_then(|s| s.tls.as_ref())
    }

    /// Whether the REST interface is served over TLS.
    #[must_use]
    pub fn http_tls_enabled(&self) -> bool {
        self.tls().and_then(|t| t.http.as_ref()).is_some()
    }

    /// Whether dashboards are enabled.
    #[must_use]
    pub fn dashboards_enabled(&self) -> bool {
        self.dashboards.as_ref().is_some_and(|d| d.enable)
    }
}

// ============================================================================
// Security plugin and snapshot kinds
// ============================================================================

/// Reference to the `OpenSearchCluster` an object belongs to.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ClusterReference {
    pub name: String,
}

/// Reference to a key inside a `Secret`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SecretKeyReference {
    pub name: String,
    pub key: String,
}

/// Status shared by the security plugin and snapshot kinds.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedObjectStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_cluster: Option<String>,
}

/// `OpensearchUser` declares an internal user of the security plugin.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.org",
    version = "v1",
    kind = "OpensearchUser",
    namespaced,
    doc = "OpensearchUser declares an internal user of the OpenSearch security plugin."
)]
#[kube(status = "ManagedObjectStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpensearchUserSpec {
    pub opensearch_cluster: ClusterReference,
    pub password_from: SecretKeyReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
}

/// Index-level permissions of a role.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexPermission {
    pub index_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dls: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fls: Option<Vec<String>>,
}

/// Tenant-level permissions of a role.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantPermission {
    pub tenant_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_actions: Option<Vec<String>>,
}

/// `OpensearchRole` declares a role of the security plugin.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.org",
    version = "v1",
    kind = "OpensearchRole",
    namespaced,
    doc = "OpensearchRole declares a role of the OpenSearch security plugin."
)]
#[kube(status = "ManagedObjectStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpensearchRoleSpec {
    pub opensearch_cluster: ClusterReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_permissions: Option<Vec<IndexPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_permissions: Option<Vec<TenantPermission>>,
}

/// `OpensearchTenant` declares a dashboards tenant.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.org",
    version = "v1",
    kind = "OpensearchTenant",
    namespaced,
    doc = "OpensearchTenant declares a tenant of the OpenSearch security plugin."
)]
#[kube(status = "ManagedObjectStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpensearchTenantSpec {
    pub opensearch_cluster: ClusterReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `OpensearchActionGroup` declares a named bundle of permissions.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.org",
    version = "v1",
    kind = "OpensearchActionGroup",
    namespaced,
    doc = "OpensearchActionGroup declares an action group of the OpenSearch security plugin."
)]
#[kube(status = "ManagedObjectStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpensearchActionGroupSpec {
    pub opensearch_cluster: ClusterReference,
    pub allowed_actions: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Snapshot contents.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_unavailable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_global_state: Option<bool>,
}

/// Cron schedule of a snapshot policy step.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CronSchedule {
    pub expression: String,
    pub timezone: String,
}

/// Snapshot creation step.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCreation {
    pub schedule: CronSchedule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<String>,
}

/// Snapshot retention step.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDeletion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<CronSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<i32>,
}

/// `OpensearchSnapshotPolicy` declares a snapshot management policy.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.org",
    version = "v1",
    kind = "OpensearchSnapshotPolicy",
    namespaced,
    doc = "OpensearchSnapshotPolicy declares a snapshot management policy for an OpenSearch cluster."
)]
#[kube(status = "ManagedObjectStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpensearchSnapshotPolicySpec {
    pub opensearch_cluster: ClusterReference,
    pub policy_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub snapshot_config: SnapshotConfig,
    pub creation: SnapshotCreation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion: Option<SnapshotDeletion>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
