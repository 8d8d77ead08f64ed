// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status aggregation for `OpenSearchCluster`.
//!
//! `status.componentsStatus` is the operator's durable memory: the scaler persists its
//! per-pool protocol state there, so every row must survive restarts. Rows are keyed by
//! `component`, except scaler rows, which are keyed by `(component, description)` because
//! the description (`Group-{index}`) identifies the node pool.
//!
//! Subreconcilers never write status themselves. They record [`StatusDelta`]s in the
//! pass context and the cluster reconciler applies them here and persists the result
//! with a single status patch per pass.

use crate::crd::{ClusterPhase, ClusterStatus, ComponentStatus, OpenSearchCluster};
use crate::errors::Result;
use crate::opensearch_resources::deployed_cluster_name;
use crate::reconcilers::pass_context::StatusDelta;
use crate::store::ObjectStore;
use kube::ResourceExt;
use serde_json::json;
use tracing::debug;

/// Component name of the scaler's per-pool rows.
pub const SCALER_COMPONENT: &str = "Scaler";

/// Component name of the lifecycle sentinel row.
pub const CLUSTER_COMPONENT: &str = "Cluster";

fn same_row(row: &ComponentStatus, component: &str, description: &str) -> bool {
    row.component == component && (component != SCALER_COMPONENT || row.description == description)
}

/// Find a row by its key.
#[must_use]
pub fn find_row<'a>(
    rows: &'a [ComponentStatus],
    component: &str,
    description: &str,
) -> Option<&'a ComponentStatus> {
    rows.iter()
        .find(|row| same_row(row, component, description))
}

/// Apply deltas in order. Upserts replace the matching row in place, keeping the list's
/// order stable, or append a new one.
#[must_use]
pub fn apply_deltas(rows: &[ComponentStatus], deltas: &[StatusDelta]) -> Vec<ComponentStatus> {
    let mut result = rows.to_vec();
    for delta in deltas {
        match delta {
            StatusDelta::Upsert(row) => {
                match result
                    .iter_mut()
                    .find(|existing| same_row(existing, &row.component, &row.description))
                {
                    Some(existing) => *existing = row.clone(),
                    None => result.push(row.clone()),
                }
            }
            StatusDelta::Remove {
                component,
                description,
            } => result.retain(|existing| !same_row(existing, component, description)),
        }
    }
    result
}

/// Current status of a cluster, defaulted when unset.
#[must_use]
pub fn current_status(cluster: &OpenSearchCluster) -> ClusterStatus {
    cluster.status.clone().unwrap_or_default()
}

/// Persist a phase change together with the full row list.
///
/// The deployed cluster name is written on every phase change so a later edit of
/// `clusterName` can be detected.
///
/// # Errors
///
/// Returns the store error when the status patch fails.
pub async fn write_phase<S: ObjectStore>(
    store: &S,
    cluster: &OpenSearchCluster,
    phase: ClusterPhase,
    rows: &[ComponentStatus],
    observed_generation: Option<i64>,
) -> Result<()> {
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();
    debug!(namespace = %namespace, name = %name, phase = %phase, "Writing cluster phase");

    let mut status = json!({
        "phase": phase,
        "componentsStatus": rows,
        "clusterName": deployed_cluster_name(cluster),
    });
    if let Some(generation) = observed_generation {
        status["observedGeneration"] = json!(generation);
    }
    store
        .patch_status::<OpenSearchCluster>(&namespace, &name, status)
        .await
}

/// Persist the row list if it differs from what the cluster already carries.
///
/// Returns `true` when a write was issued.
///
/// # Errors
///
/// Returns the store error when the status patch fails.
pub async fn write_rows_if_changed<S: ObjectStore>(
    store: &S,
    cluster: &OpenSearchCluster,
    rows: &[ComponentStatus],
) -> Result<bool> {
    if current_status(cluster).components_status == rows {
        return Ok(false);
    }
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();
    debug!(namespace = %namespace, name = %name, rows = rows.len(), "Writing component status");
    store
        .patch_status::<OpenSearchCluster>(
            &namespace,
            &name,
            json!({ "componentsStatus": rows }),
        )
        .await?;
    Ok(true)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
