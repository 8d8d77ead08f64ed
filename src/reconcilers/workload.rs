// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workload subreconciler.
//!
//! Ensures the client-facing service and, for every node pool, a headless service and a
//! `StatefulSet` exist. Existing objects are left as they are: after creation the scaler
//! owns `spec.replicas`, and other in-place changes are out of scope.

use crate::context::Context;
use crate::crd::OpenSearchCluster;
use crate::errors::Result;
use crate::opensearch_resources::{
    build_external_service, build_headless_service, build_statefulset, target_namespace,
};
use crate::reconcilers::pass_context::{PassContext, Progress};
use crate::reconcilers::resources::create_if_absent;
use crate::store::ObjectStore;
use tracing::debug;

/// Advance the workload facet of a cluster.
///
/// # Errors
///
/// Returns a transient error when any service or `StatefulSet` cannot be read or created.
pub async fn reconcile_workload<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    pass: &mut PassContext,
) -> Result<Progress> {
    let namespace = target_namespace(cluster);
    create_if_absent(&ctx.store, &namespace, &build_external_service(cluster)).await?;

    for pool in &cluster.spec.node_pools {
        debug!(namespace = %namespace, pool = %pool.component, "Ensuring node pool workload");
        create_if_absent(&ctx.store, &namespace, &build_headless_service(cluster, pool)).await?;
        create_if_absent(
            &ctx.store,
            &namespace,
            &build_statefulset(cluster, pool, &pass.volumes, &pass.volume_mounts),
        )
        .await?;
    }
    Ok(Progress::Done)
}
