// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scaler subreconciler: the safe scale-down protocol.
//!
//! Each node pool (a "group", by index) is driven one node at a time. Scale-up adds one
//! replica per pass. Scale-down walks the highest-ordinal node through
//!
//! ```text
//! idle --exclude--> Excluded --no shards--> Drained --decrement--> idle
//! ```
//!
//! coordinating with the engine's shard-allocation API so a node is only removed once it
//! holds no shards. The protocol state lives in a `status.componentsStatus` row
//! (`component = "Scaler"`, `description = "Group-{index}"`, `node` naming the pod), so a
//! pass can resume from the persisted status and the observed `StatefulSet` alone.
//!
//! A row whose `node` is not the current highest-ordinal pod is stale: the replica count
//! moved under it (for example a decrement landed but the status write that cleared the
//! row did not). Stale rows are dropped and the group restarts from idle, so a node is
//! never removed on the strength of another node's drain.
//!
//! # States
//!
//! | Row       | Meaning                                                          |
//! |-----------|------------------------------------------------------------------|
//! | absent    | idle                                                             |
//! | `Running` | the exclude call failed; retried like idle                       |
//! | `Excluded`| the last node is excluded and draining                           |
//! | `Drained` | the last node holds no shards and may be removed                 |
//! | `Failed`  | the decrement failed; an operator must clear the row             |

use crate::context::Context;
use crate::crd::{ComponentStatus, NodePool, OpenSearchCluster};
use crate::errors::Result;
use crate::events::{actions, messages, reasons};
use crate::metrics::record_scaler_transition;
use crate::opensearch::EngineEndpoint;
use crate::opensearch_resources::{statefulset_name, target_namespace};
use crate::reconcilers::pass_context::{PassContext, Progress};
use crate::reconcilers::status::{find_row, SCALER_COMPONENT};
use crate::store::ObjectStore;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::Resource;
use std::fmt;
use tracing::{debug, info, warn};

/// Persisted protocol state of one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalerState {
    Running,
    Excluded,
    Drained,
    Failed,
}

impl ScalerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScalerState::Running => "Running",
            ScalerState::Excluded => "Excluded",
            ScalerState::Drained => "Drained",
            ScalerState::Failed => "Failed",
        }
    }

    /// Parse a status row's state. Unknown values read as idle.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Running" => Some(ScalerState::Running),
            "Excluded" => Some(ScalerState::Excluded),
            "Drained" => Some(ScalerState::Drained),
            "Failed" => Some(ScalerState::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ScalerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Group-{index}`
#[must_use]
pub fn group_description(group: usize) -> String {
    format!("Group-{group}")
}

/// Protocol state of a group as persisted on the cluster.
#[must_use]
pub fn group_state(cluster: &OpenSearchCluster, group: usize) -> Option<ScalerState> {
    let rows = cluster
        .status
        .as_ref()
        .map(|s| s.components_status.as_slice())
        .unwrap_or_default();
    find_row(rows, SCALER_COMPONENT, &group_description(group))
        .and_then(|row| ScalerState::parse(&row.state))
}

/// Per-group view shared by the transition handlers.
struct Group<'a, S: ObjectStore> {
    ctx: &'a Context<S>,
    cluster: &'a OpenSearchCluster,
    endpoint: EngineEndpoint,
    index: usize,
    description: String,
    statefulset: StatefulSet,
    observed: i32,
    desired: i32,
    recorded_node: Option<String>,
}

impl<S: ObjectStore> Group<'_, S> {
    /// Highest-ordinal pod of the observed `StatefulSet`.
    fn last_node(&self) -> String {
        format!(
            "{}-{}",
            statefulset_name(self.cluster, &self.cluster.spec.node_pools[self.index]),
            self.observed - 1
        )
    }

    fn note(&self, message: &str, node: &str) -> String {
        format!("{message} {node} ({})", self.description)
    }

    fn set_state(&self, pass: &mut PassContext, state: ScalerState, node: &str) {
        record_scaler_transition(state.as_str());
        pass.upsert_status(
            ComponentStatus::new(SCALER_COMPONENT, state.as_str(), &self.description)
                .with_node(node),
        );
    }

    /// Whether the persisted row was written for the current highest-ordinal pod.
    fn row_matches_last_node(&self) -> bool {
        self.recorded_node.as_deref() == Some(self.last_node().as_str())
    }

    /// Drop a row that no longer describes the last node and start over from idle.
    async fn restart(&self, pass: &mut PassContext, state: ScalerState) -> Result<Progress> {
        let last = self.last_node();
        warn!(
            group = self.index,
            state = %state,
            recorded = ?self.recorded_node,
            last_node = %last,
            "Scaler row does not match the last node, restarting from idle"
        );
        if let Some(recorded) = &self.recorded_node {
            self.ctx.engine.remove_exclude(&self.endpoint, recorded).await?;
        }
        record_scaler_transition("restarted");
        self.clear_state(pass);
        Ok(Progress::Requeue)
    }

    fn clear_state(&self, pass: &mut PassContext) {
        pass.remove_status(SCALER_COMPONENT, &self.description);
    }

    async fn normal(&self, message: &str, node: &str) {
        let object_ref = self.cluster.object_ref(&());
        self.ctx
            .publish_normal(&object_ref, reasons::SCALER, actions::SCALE, self.note(message, node))
            .await;
    }

    async fn warning(&self, message: &str, node: &str) {
        let object_ref = self.cluster.object_ref(&());
        self.ctx
            .publish_warning(&object_ref, reasons::SCALER, actions::SCALE, self.note(message, node))
            .await;
    }

    /// Write a new replica count. A stale read surfaces as a conflict.
    async fn set_replicas(&self, replicas: i32) -> Result<()> {
        let mut statefulset = self.statefulset.clone();
        if let Some(spec) = statefulset.spec.as_mut() {
            spec.replicas = Some(replicas);
        }
        self.ctx
            .store
            .replace(&target_namespace(self.cluster), &statefulset)
            .await?;
        Ok(())
    }

    async fn idle(&self, pass: &mut PassContext, retrying: bool) -> Result<Progress> {
        if self.observed == self.desired {
            if retrying {
                self.clear_state(pass);
            }
            return Ok(Progress::Done);
        }

        if self.observed < self.desired {
            let node = format!(
                "{}-{}",
                statefulset_name(self.cluster, &self.cluster.spec.node_pools[self.index]),
                self.observed
            );
            match self.set_replicas(self.observed + 1).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => return Ok(Progress::Requeue),
                Err(e) => return Err(e),
            }
            info!(group = self.index, node = %node, "Scaled up node pool by one");
            record_scaler_transition("added");
            if retrying {
                self.clear_state(pass);
            }
            self.normal(messages::ADDED_NODE, &node).await;
            return Ok(Progress::Requeue);
        }

        let node = self.last_node();
        match self.ctx.engine.append_exclude(&self.endpoint, &node).await {
            Ok(true) => {
                info!(group = self.index, node = %node, "Excluded node from shard allocation");
                self.set_state(pass, ScalerState::Excluded, &node);
                self.normal(messages::EXCLUDED_NODE, &node).await;
                Ok(Progress::Requeue)
            }
            Ok(false) => {
                warn!(group = self.index, node = %node, "Exclude was not acknowledged");
                self.set_state(pass, ScalerState::Running, &node);
                self.warning(messages::FAILED_TO_EXCLUDE, &node).await;
                Ok(Progress::Requeue)
            }
            Err(e) => {
                warn!(group = self.index, node = %node, error = %e, "Failed to exclude node");
                self.set_state(pass, ScalerState::Running, &node);
                self.warning(messages::FAILED_TO_EXCLUDE, &node).await;
                Err(e)
            }
        }
    }

    async fn excluded(&self, pass: &mut PassContext) -> Result<Progress> {
        let node = self.last_node();

        if self.observed <= self.desired {
            // Desired count was raised back while draining.
            self.ctx.engine.remove_exclude(&self.endpoint, &node).await?;
            info!(group = self.index, node = %node, "Scale-down cancelled, exclusion removed");
            record_scaler_transition("cancelled");
            self.clear_state(pass);
            return Ok(Progress::Requeue);
        }

        if self.ctx.engine.has_shards_on(&self.endpoint, &node).await? {
            debug!(group = self.index, node = %node, "Node still holds shards");
            self.normal(messages::DRAINING_NODE, &node).await;
            return Ok(Progress::Requeue);
        }

        if self.ctx.engine.remove_exclude(&self.endpoint, &node).await? {
            info!(group = self.index, node = %node, "Node has drained");
            self.set_state(pass, ScalerState::Drained, &node);
            self.normal(messages::NODE_DRAINED, &node).await;
        }
        Ok(Progress::Requeue)
    }

    async fn drained(&self, pass: &mut PassContext) -> Result<Progress> {
        let node = self.last_node();

        if self.observed <= self.desired {
            self.clear_state(pass);
            return Ok(Progress::Requeue);
        }

        match self.set_replicas(self.observed - 1).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => return Ok(Progress::Requeue),
            Err(e) => {
                warn!(group = self.index, node = %node, error = %e, "Failed to remove node");
                self.set_state(pass, ScalerState::Failed, &node);
                self.warning(messages::FAILED_TO_REMOVE, &node).await;
                return Ok(Progress::Done);
            }
        }
        info!(group = self.index, node = %node, "Removed node from pool");
        record_scaler_transition("removed");
        self.clear_state(pass);
        self.normal(messages::REMOVED_NODE, &node).await;

        if let Err(e) = self.ctx.engine.remove_exclude(&self.endpoint, &node).await {
            debug!(group = self.index, node = %node, error = %e, "Best-effort exclude cleanup failed");
        }
        Ok(Progress::Requeue)
    }

    async fn failed(&self) -> Progress {
        let node = self.last_node();
        self.warning(messages::FAILED_TO_REMOVE, &node).await;
        Progress::Done
    }
}

async fn reconcile_group<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    index: usize,
    pool: &NodePool,
    pass: &mut PassContext,
) -> Result<Progress> {
    let namespace = target_namespace(cluster);
    let name = statefulset_name(cluster, pool);
    let Some(statefulset) = ctx.store.get::<StatefulSet>(&namespace, &name).await? else {
        debug!(namespace = %namespace, name = %name, "StatefulSet not created yet");
        return Ok(Progress::Done);
    };
    let observed = statefulset
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(0);

    let recorded_node = cluster
        .status
        .as_ref()
        .and_then(|s| find_row(&s.components_status, SCALER_COMPONENT, &group_description(index)))
        .and_then(|row| row.node.clone());

    let group = Group {
        ctx,
        cluster,
        endpoint: EngineEndpoint::for_cluster(cluster),
        index,
        description: group_description(index),
        statefulset,
        observed,
        desired: pool.replicas,
        recorded_node,
    };
    let state = group_state(cluster, index);
    debug!(group = index, observed, desired = pool.replicas, state = ?state, "Scaler pass");

    match state {
        None => group.idle(pass, false).await,
        Some(ScalerState::Running) => group.idle(pass, true).await,
        Some(s @ (ScalerState::Excluded | ScalerState::Drained))
            if !group.row_matches_last_node() =>
        {
            group.restart(pass, s).await
        }
        Some(ScalerState::Excluded) => group.excluded(pass).await,
        Some(ScalerState::Drained) => group.drained(pass).await,
        Some(ScalerState::Failed) => Ok(group.failed().await),
    }
}

/// Advance the scaler for every node pool.
///
/// Groups are independent; the first error is returned after every group has had its
/// turn, so status rows of the other groups still land.
///
/// # Errors
///
/// Returns a transient error when the engine or the `StatefulSet` cannot be reached.
pub async fn reconcile_scaler<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    pass: &mut PassContext,
) -> Result<Progress> {
    let mut progress = Progress::Done;
    let mut first_error = None;
    for (index, pool) in cluster.spec.node_pools.iter().enumerate() {
        ctx.check_cancelled()?;
        match reconcile_group(ctx, cluster, index, pool, pass).await {
            Ok(p) => progress = progress.and(p),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(progress),
    }
}

#[cfg(test)]
#[path = "scaler_tests.rs"]
mod scaler_tests;
