// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_OPERATOR: &str = "opensearch-operator";

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_OPENSEARCH: &str = "opensearch";

/// Application name for engine nodes
pub const APP_NAME_OPENSEARCH: &str = "opensearch";

/// Application name for dashboards pods
pub const APP_NAME_DASHBOARDS: &str = "opensearch-dashboards";

/// Component value for engine node pods
pub const COMPONENT_NODE: &str = "node";

/// Component value for dashboards pods
pub const COMPONENT_DASHBOARDS: &str = "dashboards";

// ============================================================================
// Operator-Specific Labels
// ============================================================================

/// Label naming the cluster a workload belongs to
pub const CLUSTER_LABEL: &str = "opensearch.org/cluster";

/// Label naming the node pool a workload belongs to
pub const NODEPOOL_LABEL: &str = "opensearch.org/nodepool";

// ============================================================================
// Migration Annotations
// ============================================================================

/// Lineage: the object was produced from the legacy group
pub const ANNOTATION_MIGRATED_FROM: &str = "opensearch.org/migrated-from";

/// Lineage: when the forward copy was created
pub const ANNOTATION_MIGRATION_TIMESTAMP: &str = "opensearch.org/migration-timestamp";

/// Lineage: uid of the user-authored side
pub const ANNOTATION_SOURCE_UID: &str = "opensearch.org/source-uid";

/// Lineage: when the spec was last copied across
pub const ANNOTATION_MIGRATION_SYNC: &str = "opensearch.org/migration-sync";

/// Lineage: the legacy object was produced from the current group
pub const ANNOTATION_REVERSE_MIGRATED_FROM: &str = "opensearch.org/reverse-migrated-from";

/// All annotations that only record lineage. They never take part in spec comparison
/// and are not copied back onto the authoritative side.
pub const LINEAGE_ANNOTATIONS: [&str; 5] = [
    ANNOTATION_MIGRATED_FROM,
    ANNOTATION_MIGRATION_TIMESTAMP,
    ANNOTATION_SOURCE_UID,
    ANNOTATION_MIGRATION_SYNC,
    ANNOTATION_REVERSE_MIGRATED_FROM,
];

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer guarding teardown of an `OpenSearchCluster`
pub const FINALIZER_CLUSTER: &str = "Opster";

/// Finalizer guarding paired deletion of a migrated object
pub const FINALIZER_MIGRATION: &str = "opensearch.org/migration";
