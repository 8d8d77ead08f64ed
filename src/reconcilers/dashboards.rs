// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dashboards subreconciler.
//!
//! When `spec.dashboards.enable` is set, ensures the dashboards config map, deployment and
//! service exist. Disabling dashboards later leaves the objects in place.

use crate::context::Context;
use crate::crd::OpenSearchCluster;
use crate::errors::Result;
use crate::opensearch_resources::{
    build_dashboards_config_map, build_dashboards_deployment, build_dashboards_service,
    target_namespace,
};
use crate::reconcilers::pass_context::{PassContext, Progress};
use crate::reconcilers::resources::create_if_absent;
use crate::store::ObjectStore;

/// Advance the dashboards facet of a cluster.
///
/// # Errors
///
/// Returns a transient error when any dashboards object cannot be read or created.
pub async fn reconcile_dashboards<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    _pass: &mut PassContext,
) -> Result<Progress> {
    if !cluster.spec.dashboards_enabled() {
        return Ok(Progress::Done);
    }
    let namespace = target_namespace(cluster);
    create_if_absent(&ctx.store, &namespace, &build_dashboards_config_map(cluster)).await?;
    create_if_absent(&ctx.store, &namespace, &build_dashboards_deployment(cluster)).await?;
    create_if_absent(&ctx.store, &namespace, &build_dashboards_service(cluster)).await?;
    Ok(Progress::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_cluster, Harness};
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{ConfigMap, Service};

    #[tokio::test]
    async fn test_enabled_dashboards_are_created() {
        let harness = Harness::new();
        let cluster = harness.store().insert(&sample_cluster());

        reconcile_dashboards(&harness.ctx, &cluster, &mut PassContext::new())
            .await
            .expect("dashboards created");

        assert!(harness
            .store()
            .object::<Deployment>("c1", "c1-dashboards")
            .is_some());
        assert!(harness
            .store()
            .object::<ConfigMap>("c1", "opensearch-dashboards")
            .is_some());
        assert!(harness
            .store()
            .object::<Service>("c1", "es-svc-dashboards-svc")
            .is_some());
    }

    #[tokio::test]
    async fn test_disabling_leaves_existing_objects() {
        // Arrange
        let harness = Harness::new();
        let mut cluster = harness.store().insert(&sample_cluster());
        reconcile_dashboards(&harness.ctx, &cluster, &mut PassContext::new())
            .await
            .expect("dashboards created");

        // Act
        if let Some(d) = cluster.spec.dashboards.as_mut() {
            d.enable = false;
        }
        reconcile_dashboards(&harness.ctx, &cluster, &mut PassContext::new())
            .await
            .expect("no-op");

        // Assert
        assert!(harness
            .store()
            .object::<Deployment>("c1", "c1-dashboards")
            .is_some());
    }

    #[tokio::test]
    async fn test_disabled_dashboards_create_nothing() {
        let harness = Harness::new();
        let mut cluster = sample_cluster();
        cluster.spec.dashboards = None;
        let cluster = harness.store().insert(&cluster);

        reconcile_dashboards(&harness.ctx, &cluster, &mut PassContext::new())
            .await
            .expect("no-op");

        assert!(harness.store().names::<Deployment>("c1").is_empty());
    }
}
