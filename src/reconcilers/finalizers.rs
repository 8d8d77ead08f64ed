// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for Kubernetes resources.
//!
//! This module provides reusable functions for adding and removing finalizers on any
//! namespaced resource the operator manages. The cluster reconciler guards teardown of a
//! cluster's namespace with the `Opster` finalizer; the migration controllers guard paired
//! deletion with `opensearch.org/migration`.
//!
//! Both patches replace the whole finalizer list, so they carry the resource version the
//! list was read at. A concurrent writer turns the patch into a conflict instead of a
//! silently dropped finalizer; callers re-read and retry.
//!
//! # Example
//!
//! ```rust,ignore
//! use opensearch_operator::reconcilers::finalizers::{ensure_finalizer, has_finalizer};
//! use opensearch_operator::labels::FINALIZER_CLUSTER;
//!
//! async fn reconcile(store: &KubeStore, cluster: &OpenSearchCluster) -> Result<()> {
//!     if cluster.metadata.deletion_timestamp.is_some() {
//!         if has_finalizer(cluster, FINALIZER_CLUSTER) {
//!             // tear down, then remove_finalizer(...)
//!         }
//!         return Ok(());
//!     }
//!     ensure_finalizer(store, cluster, FINALIZER_CLUSTER).await?;
//!     Ok(())
//! }
//! ```

use crate::errors::Result;
use crate::store::{Managed, ObjectStore};
use kube::ResourceExt;
use serde_json::{json, Value};
use tracing::info;

/// Whether the resource carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: Managed>(resource: &T, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Whether the resource has been marked for deletion.
#[must_use]
pub fn is_deleting<T: Managed>(resource: &T) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

/// Merge patch writing `finalizers`, guarded by the resource version they were read at.
fn finalizers_patch<T: Managed>(resource: &T, finalizers: &[String]) -> Value {
    let mut patch = json!({ "metadata": { "finalizers": finalizers } });
    if let Some(version) = resource.resource_version() {
        patch["metadata"]["resourceVersion"] = json!(version);
    }
    patch
}

/// Add a finalizer to a resource if not already present.
///
/// The operation is idempotent. Returns `true` when a patch was issued.
///
/// # Errors
///
/// Returns an error if the metadata patch fails, or a conflict when the resource changed
/// since it was read.
pub async fn ensure_finalizer<S, T>(store: &S, resource: &T, finalizer: &str) -> Result<bool>
where
    S: ObjectStore,
    T: Managed,
{
    if has_finalizer(resource, finalizer) {
        return Ok(false);
    }
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    let patch = finalizers_patch(resource, &finalizers);
    store.patch_merge::<T>(&namespace, &name, patch).await?;
    Ok(true)
}

/// Remove a finalizer from a resource.
///
/// The operation is idempotent. Returns `true` when a patch was issued.
///
/// # Errors
///
/// Returns an error if the metadata patch fails, or a conflict when the resource changed
/// since it was read.
pub async fn remove_finalizer<S, T>(store: &S, resource: &T, finalizer: &str) -> Result<bool>
where
    S: ObjectStore,
    T: Managed,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(false);
    }
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let finalizers: Vec<String> = resource
        .finalizers()
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    let patch = finalizers_patch(resource, &finalizers);
    store.patch_merge::<T>(&namespace, &name, patch).await?;
    Ok(true)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
