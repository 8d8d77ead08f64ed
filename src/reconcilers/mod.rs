// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for OpenSearch resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor resource changes via the Kubernetes API
//! 2. **Reconcile** - Compare the declared descriptor with the platform's state
//! 3. **Update** - Create the missing objects, advance multi-pass transitions
//! 4. **Status** - Report progress back on the descriptor
//!
//! # Available Reconcilers
//!
//! ## Cluster lifecycle
//!
//! - [`reconcile_cluster`] - Drives an `OpenSearchCluster` through its phases and runs the
//!   subreconcilers in order: [`tls`], [`configuration`], [`workload`], [`scaler`],
//!   [`dashboards`]
//! - [`error_policy`] - Requeue decision after a failed cluster pass
//!
//! ## Migration
//!
//! - [`reconcile_forward`] - Copies legacy-group objects into the current group
//! - [`reconcile_reverse`] - Mirrors current-group objects into the legacy group
//! - [`migration_error_policy`] - Requeue decision after a failed migration pass
//!
//! # Example: Running the cluster reconciler
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use kube::runtime::{watcher::Config, Controller};
//! use kube::Api;
//! use opensearch_operator::context::Context;
//! use opensearch_operator::crd::OpenSearchCluster;
//! use opensearch_operator::reconcilers::{error_policy, reconcile_cluster};
//! use opensearch_operator::store::KubeStore;
//! use std::sync::Arc;
//!
//! async fn run(api: Api<OpenSearchCluster>, ctx: Arc<Context>) {
//!     Controller::new(api, Config::default())
//!         .run(reconcile_cluster::<KubeStore>, error_policy::<KubeStore>, ctx)
//!         .for_each(|_| futures::future::ready(()))
//!         .await;
//! }
//! ```

pub mod cluster;
pub mod configuration;
pub mod dashboards;
pub mod finalizers;
pub mod migration;
pub mod pass_context;
pub mod resources;
pub mod retry;
pub mod scaler;
pub mod status;
pub mod tls;
pub mod validation;
pub mod workload;

pub use cluster::{error_policy, reconcile_cluster};
pub use migration::{migration_error_policy, reconcile_forward, reconcile_reverse};

/// Check if a resource's spec has changed by comparing generation with `observed_generation`.
///
/// The `metadata.generation` field is incremented by Kubernetes only when the spec changes,
/// while `status.observedGeneration` is recorded by the controller when it gives up on a
/// spec. A cluster parked in `ERROR` is retried once this returns `true`.
///
/// # Arguments
///
/// * `current_generation` - The resource's current `metadata.generation`
/// * `observed_generation` - The controller's last `status.observedGeneration`
///
/// # Kubernetes Generation Semantics
///
/// - When they match: the spec has not changed since it was last judged
/// - When they differ: the spec has changed
/// - When `observed_generation` is None: the spec was never judged
#[must_use]
pub fn should_reconcile(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true,
        _ => false,
    }
}
