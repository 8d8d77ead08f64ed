// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `OpenSearchCluster` reconciliation logic.
//!
//! Drives one cluster descriptor through its lifecycle:
//!
//! 1. **Fetch** the descriptor; a missing descriptor ends the pass.
//! 2. **Finalizer gate**: add the `Opster` finalizer, or tear the cluster down (delete its
//!    namespace) and release the finalizer when the descriptor is being deleted.
//! 3. **Phase dispatch**: empty → `PENDING` → `RUNNING`; `ERROR` is sticky until the spec
//!    changes.
//! 4. **Subreconcilers** in fixed order: namespace, TLS, configuration, workload, scaler,
//!    dashboards, sharing one [`PassContext`].
//! 5. **Status**: deltas are applied to `status.componentsStatus` and written once.
//! 6. **Requeue**: immediate while a transition is in flight, backoff after a transient
//!    error, long poll otherwise.

use crate::constants::{IMMEDIATE_REQUEUE_SECS, KIND_OPENSEARCH_CLUSTER};
use crate::context::Context;
use crate::crd::{ClusterPhase, ComponentStatus, OpenSearchCluster};
use crate::errors::{Error, ErrorKind, Result};
use crate::events::{actions, reasons};
use crate::labels::FINALIZER_CLUSTER;
use crate::metrics::{
    record_error, record_reconciliation_error, record_reconciliation_success, record_requeue,
};
use crate::opensearch_resources::{build_namespace, deployed_cluster_name, target_namespace};
use crate::reconcilers::configuration::reconcile_configuration;
use crate::reconcilers::dashboards::reconcile_dashboards;
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, is_deleting, remove_finalizer};
use crate::reconcilers::pass_context::{PassContext, Progress, StatusDelta};
use crate::reconcilers::scaler::reconcile_scaler;
use crate::reconcilers::should_reconcile;
use crate::reconcilers::status::{
    apply_deltas, current_status, write_phase, write_rows_if_changed, CLUSTER_COMPONENT,
};
use crate::reconcilers::tls::reconcile_tls;
use crate::reconcilers::validation::validate_cluster;
use crate::reconcilers::workload::reconcile_workload;
use crate::store::ObjectStore;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Sentinel row tracking the coarse lifecycle.
fn lifecycle_row(phase: ClusterPhase) -> ComponentStatus {
    let state = match phase {
        ClusterPhase::Pending => "Pending",
        ClusterPhase::Running => "Running",
        ClusterPhase::Error => "Error",
    };
    ComponentStatus::new(CLUSTER_COMPONENT, state, "")
}

fn with_lifecycle(rows: &[ComponentStatus], phase: ClusterPhase) -> Vec<ComponentStatus> {
    apply_deltas(rows, &[StatusDelta::Upsert(lifecycle_row(phase))])
}

fn immediate() -> Action {
    record_requeue(KIND_OPENSEARCH_CLUSTER, "immediate");
    Action::requeue(Duration::from_secs(IMMEDIATE_REQUEUE_SECS))
}

fn long_poll<S: ObjectStore>(ctx: &Context<S>) -> Action {
    record_requeue(KIND_OPENSEARCH_CLUSTER, "poll");
    Action::requeue(ctx.config.requeue)
}

/// Reconcile an `OpenSearchCluster`.
///
/// # Errors
///
/// Returns transient errors for the controller's error policy to back off on. Unsupported
/// configurations are not errors: they move the cluster to `ERROR`. Write conflicts
/// requeue immediately.
pub async fn reconcile_cluster<S: ObjectStore>(
    cluster: Arc<OpenSearchCluster>,
    ctx: Arc<Context<S>>,
) -> Result<Action> {
    let start = Instant::now();
    let result = match reconcile_cluster_inner(&cluster, &ctx).await {
        Err(e) if e.is_conflict() => {
            debug!(error = %e, "Conflict during cluster reconciliation, re-reading");
            Ok(immediate())
        }
        other => other,
    };
    match &result {
        Ok(_) => record_reconciliation_success(KIND_OPENSEARCH_CLUSTER, start.elapsed()),
        Err(_) => record_reconciliation_error(KIND_OPENSEARCH_CLUSTER, start.elapsed()),
    }
    result
}

async fn reconcile_cluster_inner<S: ObjectStore>(
    requested: &OpenSearchCluster,
    ctx: &Context<S>,
) -> Result<Action> {
    let namespace = requested.namespace().unwrap_or_default();
    let name = requested.name_any();
    debug!(namespace = %namespace, name = %name, "Reconciling OpenSearchCluster");

    let Some(cluster) = ctx
        .store
        .get::<OpenSearchCluster>(&namespace, &name)
        .await?
    else {
        debug!(namespace = %namespace, name = %name, "OpenSearchCluster is gone");
        return Ok(Action::await_change());
    };

    if is_deleting(&cluster) {
        return teardown(ctx, &cluster).await;
    }
    ensure_finalizer(&ctx.store, &cluster, FINALIZER_CLUSTER).await?;

    let status = current_status(&cluster);
    match status.phase {
        None => {
            ctx.check_cancelled()?;
            let rows = with_lifecycle(&status.components_status, ClusterPhase::Pending);
            write_phase(&ctx.store, &cluster, ClusterPhase::Pending, &rows, None).await?;
            info!(namespace = %namespace, name = %name, "OpenSearchCluster is PENDING");
            Ok(immediate())
        }
        Some(ClusterPhase::Pending) => {
            ctx.check_cancelled()?;
            let rows = with_lifecycle(&status.components_status, ClusterPhase::Running);
            write_phase(&ctx.store, &cluster, ClusterPhase::Running, &rows, None).await?;
            info!(namespace = %namespace, name = %name, "OpenSearchCluster is RUNNING");
            Ok(immediate())
        }
        Some(ClusterPhase::Error) => {
            if should_reconcile(cluster.metadata.generation, status.observed_generation) {
                ctx.check_cancelled()?;
                info!(namespace = %namespace, name = %name, "Spec changed, retrying from PENDING");
                let rows = with_lifecycle(&status.components_status, ClusterPhase::Pending);
                write_phase(&ctx.store, &cluster, ClusterPhase::Pending, &rows, None).await?;
                return Ok(immediate());
            }
            ctx.publish_warning(
                &cluster.object_ref(&()),
                reasons::CLUSTER_ERROR,
                actions::RECONCILE,
                "cluster is in ERROR phase; edit the spec to retry".to_string(),
            )
            .await;
            Ok(long_poll(ctx))
        }
        Some(ClusterPhase::Running) => run_sequence(ctx, &cluster).await,
    }
}

/// Delete the namespace the cluster was deployed to, then release the finalizer.
async fn teardown<S: ObjectStore>(ctx: &Context<S>, cluster: &OpenSearchCluster) -> Result<Action> {
    if !has_finalizer(cluster, FINALIZER_CLUSTER) {
        return Ok(Action::await_change());
    }
    let target = deployed_cluster_name(cluster);
    info!(
        namespace = %cluster.namespace().unwrap_or_default(),
        name = %cluster.name_any(),
        target = %target,
        "Tearing down OpenSearchCluster"
    );
    ctx.check_cancelled()?;
    ctx.store.delete_namespace(&target).await?;
    remove_finalizer(&ctx.store, cluster, FINALIZER_CLUSTER).await?;
    Ok(Action::await_change())
}

/// Move the cluster into `ERROR` for an unsupported configuration.
async fn enter_error<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    rows: &[ComponentStatus],
    err: &Error,
) -> Result<Action> {
    warn!(
        namespace = %cluster.namespace().unwrap_or_default(),
        name = %cluster.name_any(),
        error = %err,
        "OpenSearchCluster entering ERROR"
    );
    ctx.check_cancelled()?;
    let rows = with_lifecycle(rows, ClusterPhase::Error);
    write_phase(
        &ctx.store,
        cluster,
        ClusterPhase::Error,
        &rows,
        cluster.metadata.generation,
    )
    .await?;
    ctx.publish_warning(
        &cluster.object_ref(&()),
        reasons::UNSUPPORTED,
        actions::RECONCILE,
        err.to_string(),
    )
    .await;
    Ok(long_poll(ctx))
}

/// Run the subreconcilers in order and persist their status deltas.
async fn run_sequence<S: ObjectStore>(ctx: &Context<S>, cluster: &OpenSearchCluster) -> Result<Action> {
    let rows = current_status(cluster).components_status;
    if let Err(e) = validate_cluster(cluster) {
        return enter_error(ctx, cluster, &rows, &e).await;
    }

    ctx.check_cancelled()?;
    let target = target_namespace(cluster);
    if !ctx.store.namespace_exists(&target).await? {
        ctx.store.create_namespace(&build_namespace(cluster)).await?;
        info!(namespace = %target, "Created cluster namespace");
        return Ok(immediate());
    }

    let mut pass = PassContext::new();
    let outcome = run_subreconcilers(ctx, cluster, &mut pass).await;

    // A cancelled pass leaves no trace.
    ctx.check_cancelled()?;
    let rows = apply_deltas(&rows, pass.status_deltas());

    match outcome {
        Ok(progress) => {
            write_rows_if_changed(&ctx.store, cluster, &rows).await?;
            match progress {
                Progress::Requeue => Ok(immediate()),
                Progress::Done => Ok(long_poll(ctx)),
            }
        }
        Err(e) => match e.kind() {
            ErrorKind::Unsupported => enter_error(ctx, cluster, &rows, &e).await,
            ErrorKind::Conflict => {
                debug!(error = %e, "Write conflict, re-reading on the next pass");
                write_rows_if_changed(&ctx.store, cluster, &rows).await?;
                Ok(immediate())
            }
            ErrorKind::NotFound | ErrorKind::Transient => {
                if let Err(write_err) = write_rows_if_changed(&ctx.store, cluster, &rows).await {
                    warn!(error = %write_err, "Failed to persist status after a failed pass");
                }
                Err(e)
            }
        },
    }
}

async fn run_subreconcilers<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    pass: &mut PassContext,
) -> Result<Progress> {
    let mut progress = Progress::Done;

    ctx.check_cancelled()?;
    progress = progress.and(reconcile_tls(ctx, cluster, pass).await?);
    ctx.check_cancelled()?;
    progress = progress.and(reconcile_configuration(ctx, cluster, pass).await?);
    ctx.check_cancelled()?;
    progress = progress.and(reconcile_workload(ctx, cluster, pass).await?);
    ctx.check_cancelled()?;
    progress = progress.and(reconcile_scaler(ctx, cluster, pass).await?);
    ctx.check_cancelled()?;
    progress = progress.and(reconcile_dashboards(ctx, cluster, pass).await?);

    Ok(progress)
}

/// Error policy for the cluster controller.
///
/// Transient failures back off for the configured short delay; unsupported
/// configurations wait for the long poll; a cancelled pass waits for the next change.
pub fn error_policy<S: ObjectStore>(
    cluster: Arc<OpenSearchCluster>,
    err: &Error,
    ctx: Arc<Context<S>>,
) -> Action {
    record_error(KIND_OPENSEARCH_CLUSTER, &format!("{:?}", err.kind()));
    match err {
        Error::Cancelled => Action::await_change(),
        _ if err.kind() == ErrorKind::Unsupported => {
            record_requeue(KIND_OPENSEARCH_CLUSTER, "poll");
            Action::requeue(ctx.config.requeue)
        }
        _ => {
            error!(
                namespace = %cluster.namespace().unwrap_or_default(),
                name = %cluster.name_any(),
                error = %err,
                "OpenSearchCluster reconciliation failed"
            );
            record_requeue(KIND_OPENSEARCH_CLUSTER, "backoff");
            Action::requeue(ctx.config.backoff)
        }
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
