// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Descriptor validation run before the subreconciler sequence.
//!
//! Every violation is an unsupported configuration: the cluster enters the ERROR phase
//! and stays there until the user edits the spec.

use crate::crd::OpenSearchCluster;
use crate::errors::{Error, Result};
use std::collections::HashSet;

/// Check the structural invariants of a cluster descriptor.
///
/// # Errors
///
/// Returns [`Error::Unsupported`] naming the first violated invariant.
pub fn validate_cluster(cluster: &OpenSearchCluster) -> Result<()> {
    let general = &cluster.spec.general;
    if general.cluster_name.is_empty() {
        return Err(Error::Unsupported("spec.general.clusterName is empty".into()));
    }
    if let Some(deployed) = cluster.status.as_ref().and_then(|s| s.cluster_name.as_deref()) {
        if deployed != general.cluster_name {
            return Err(Error::Unsupported(format!(
                "spec.general.clusterName is immutable: cluster was deployed as '{deployed}'"
            )));
        }
    }
    if general.service_name.is_empty() {
        return Err(Error::Unsupported("spec.general.serviceName is empty".into()));
    }
    if cluster.spec.node_pools.is_empty() {
        return Err(Error::Unsupported("at least one node pool is required".into()));
    }

    let mut seen = HashSet::new();
    for pool in &cluster.spec.node_pools {
        if pool.component.is_empty() {
            return Err(Error::Unsupported("node pool component is empty".into()));
        }
        if !seen.insert(pool.component.as_str()) {
            return Err(Error::Unsupported(format!(
                "node pool component '{}' is not unique",
                pool.component
            )));
        }
        if pool.replicas < 0 {
            return Err(Error::Unsupported(format!(
                "node pool '{}' has negative replicas",
                pool.component
            )));
        }
        if pool.recognised_roles().is_empty() {
            return Err(Error::Unsupported(format!(
                "node pool '{}' has no recognised role (master, data, ingest)",
                pool.component
            )));
        }
    }

    if !cluster.spec.node_pools.iter().any(|p| p.has_role("master")) {
        return Err(Error::Unsupported(
            "at least one node pool must have the master role".into(),
        ));
    }
    Ok(())
}
