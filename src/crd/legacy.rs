// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kinds served under the legacy `opensearch.opster.io/v1` group.
//!
//! Every spec and status here is field-for-field the same as its counterpart in
//! [`crate::crd`]; only the group differs. The migration controllers copy between the
//! two shapes through their JSON form.

use super::{
    ClusterReference, ClusterStatus, DashboardsConfig, GeneralConfig, IndexPermission,
    ManagedObjectStatus, NodePool, SecretKeyReference, SecurityConfig, SnapshotConfig,
    SnapshotCreation, SnapshotDeletion, TenantPermission,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Legacy `OpenSearchCluster`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpenSearchCluster",
    namespaced,
    doc = "Deprecated: use opensearch.org/v1 OpenSearchCluster."
)]
#[kube(status = "ClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchClusterSpec {
    pub general: GeneralConfig,
    pub node_pools: Vec<NodePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<DashboardsConfig>,
}

/// Legacy `OpensearchUser`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpensearchUser",
    namespaced,
    doc = "Deprecated: use opensearch.org/v1 OpensearchUser."
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

/// Legacy `OpensearchRole`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpensearchRole",
    namespaced,
    doc = "Deprecated: use opensearch.org/v1 OpensearchRole."
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

/// Legacy `OpensearchTenant`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpensearchTenant",
    namespaced,
    doc = "Deprecated: use opensearch.org/v1 OpensearchTenant."
)]
#[kube(status = "ManagedObjectStatus")]
#[serde(rename_all = "camelCase")]
pub struct OpensearchTenantSpec {
    pub opensearch_cluster: ClusterReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Legacy `OpensearchActionGroup`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpensearchActionGroup",
    namespaced,
    doc = "Deprecated: use opensearch.org/v1 OpensearchActionGroup."
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

/// Legacy `OpensearchSnapshotPolicy`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "opensearch.opster.io",
    version = "v1",
    kind = "OpensearchSnapshotPolicy",
    namespaced,
    doc = "Deprecated: use opensearch.org/v1 OpensearchSnapshotPolicy."
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
