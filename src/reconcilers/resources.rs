// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic resource creation helpers for the subreconcilers.
//!
//! The subreconcilers only ever create child objects; in-place drift correction is not
//! part of their contract (replica counts are owned by the scaler). This module provides
//! the one strategy they share, create-if-absent, which treats a racing creator as
//! success.
//!
//! # Example
//!
//! ```rust,ignore
//! use opensearch_operator::reconcilers::resources::create_if_absent;
//!
//! let live = create_if_absent(&ctx.store, "c1", &build_external_service(&cluster)).await?;
//! ```

use crate::errors::Result;
use crate::metrics::record_resource_created;
use crate::store::{Managed, ObjectStore};
use kube::ResourceExt;
use tracing::{debug, info};

/// Return the live object, creating it from `desired` when absent.
///
/// An `AlreadyExists` conflict means another writer won the race; the object is
/// re-read and returned.
///
/// # Errors
///
/// Returns an error if the read or the create fails for any other reason.
pub async fn create_if_absent<S, K>(store: &S, namespace: &str, desired: &K) -> Result<K>
where
    S: ObjectStore,
    K: Managed,
{
    let name = desired.name_any();
    let kind = K::kind(&());

    if let Some(existing) = store.get::<K>(namespace, &name).await? {
        debug!(kind = %kind, namespace = %namespace, name = %name, "Resource exists, leaving as-is");
        return Ok(existing);
    }

    match store.create(namespace, desired).await {
        Ok(created) => {
            info!("Created {} {}/{}", kind, namespace, name);
            record_resource_created(&kind);
            Ok(created)
        }
        Err(e) if e.is_conflict() => {
            debug!(kind = %kind, namespace = %namespace, name = %name, "Lost create race, re-reading");
            Ok(store
                .get::<K>(namespace, &name)
                .await?
                .unwrap_or_else(|| desired.clone()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
