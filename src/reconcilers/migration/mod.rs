// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Migration between the legacy `opensearch.opster.io` group and `opensearch.org`.
//!
//! Two mirror controllers run per kind:
//!
//! - [`forward`] watches the legacy object and keeps a current-group copy of it
//! - [`reverse`] watches the current object and keeps a legacy mirror of it, so consumers
//!   that only read the legacy group keep working
//!
//! A pair is the two objects sharing `(namespace, name)`. Its lineage is recorded in
//! annotations (see [`crate::labels::LINEAGE_ANNOTATIONS`]) and both sides carry the
//! `opensearch.org/migration` finalizer so a deletion on one side is handled on the other
//! before the object goes away.
//!
//! The side the user authored is authoritative: its spec is copied onto the mirror and never
//! the other way round. Both controllers compare specs before writing and each side is
//! created at most once per pair lifetime.
//!
//! Both sides are handled through their JSON form, so one generic implementation serves
//! every migrated kind.

pub mod forward;
pub mod reverse;

pub use forward::reconcile_forward;
pub use reverse::reconcile_reverse;

use crate::context::Context;
use crate::errors::{Error, Result};
use crate::labels::{ANNOTATION_MIGRATION_SYNC, FINALIZER_MIGRATION, LINEAGE_ANNOTATIONS};
use crate::metrics::{record_error, record_requeue};
use crate::store::{Managed, ObjectStore};
use chrono::{SecondsFormat, Utc};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Metric label of the legacy to current direction.
pub const FORWARD: &str = "forward";

/// Metric label of the current to legacy direction.
pub const REVERSE: &str = "reverse";

/// Whether an object carries an annotation.
#[must_use]
pub fn has_annotation<T: Managed>(obj: &T, key: &str) -> bool {
    obj.annotations().contains_key(key)
}

/// Timestamp format used by every lineage annotation.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One top-level field of an object's JSON form, `null` when absent.
fn field<T: Managed>(obj: &T, name: &str) -> Result<Value> {
    let mut value = serde_json::to_value(obj)?;
    Ok(value.get_mut(name).map(Value::take).unwrap_or(Value::Null))
}

/// Whether two objects of either group declare the same spec.
///
/// # Errors
///
/// Returns a serialization error if either object cannot be converted to JSON.
pub fn specs_match<A: Managed, B: Managed>(a: &A, b: &B) -> Result<bool> {
    Ok(field(a, "spec")? == field(b, "spec")?)
}

/// Build the mirror of `source` in the other group.
///
/// The mirror gets the source's name, namespace, labels and spec, the source's annotations
/// without any lineage keys, then the given `lineage` annotations and the migration finalizer.
///
/// # Errors
///
/// Returns a serialization error if the source cannot be converted.
pub fn build_mirror<Src: Managed, Dst: Managed>(
    source: &Src,
    lineage: &[(&str, String)],
) -> Result<Dst> {
    let mut annotations: BTreeMap<String, String> = source
        .annotations()
        .iter()
        .filter(|(key, _)| !LINEAGE_ANNOTATIONS.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in lineage {
        annotations.insert((*key).to_string(), value.clone());
    }

    let mirror = json!({
        "apiVersion": Dst::api_version(&()),
        "kind": Dst::kind(&()),
        "metadata": {
            "name": source.name_any(),
            "namespace": source.namespace().unwrap_or_default(),
            "labels": source.labels(),
            "annotations": annotations,
            "finalizers": [FINALIZER_MIGRATION],
        },
        "spec": field(source, "spec")?,
    });
    Ok(serde_json::from_value(mirror)?)
}

/// Copy the spec of `source` onto `target` if they differ, stamping `migration-sync`.
///
/// Returns `true` when a write was issued.
///
/// # Errors
///
/// Returns [`Error::Conflict`] when `target` changed since it was read, or the store error.
pub async fn sync_spec<S, Src, Dst>(store: &S, source: &Src, target: &Dst) -> Result<bool>
where
    S: ObjectStore,
    Src: Managed,
    Dst: Managed,
{
    if specs_match(source, target)? {
        return Ok(false);
    }
    let mut updated = serde_json::to_value(target)?;
    updated["spec"] = field(source, "spec")?;
    if !updated["metadata"]["annotations"].is_object() {
        updated["metadata"]["annotations"] = Value::Object(Map::new());
    }
    updated["metadata"]["annotations"][ANNOTATION_MIGRATION_SYNC] = json!(now_rfc3339());
    let updated: Dst = serde_json::from_value(updated)?;
    store
        .replace(&target.namespace().unwrap_or_default(), &updated)
        .await?;
    Ok(true)
}

/// Merge patch that turns `target` into exactly `source` at the top level.
fn replacing_patch(source: &Value, target: &Value) -> Value {
    let mut patch = match source {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(existing) = target {
        for key in existing.keys() {
            patch.entry(key.clone()).or_insert(Value::Null);
        }
    }
    Value::Object(patch)
}

/// Reconcile the status of a linked pair.
///
/// Status is produced on the current side, where the cluster controller runs, so it is
/// copied current → legacy. A current object with no status yet is seeded from the legacy
/// one, which carries the scaler's progress across a migration.
///
/// Returns `true` when a write was issued.
///
/// # Errors
///
/// Returns the store error when the status patch fails.
pub async fn sync_status<S, C, L>(store: &S, current: &C, legacy: &L) -> Result<bool>
where
    S: ObjectStore,
    C: Managed,
    L: Managed,
{
    let current_status = field(current, "status")?;
    let legacy_status = field(legacy, "status")?;
    if current_status == legacy_status {
        return Ok(false);
    }

    if current_status.is_null() {
        debug!(name = %current.name_any(), "Seeding current status from the legacy object");
        store
            .patch_status::<C>(
                &current.namespace().unwrap_or_default(),
                &current.name_any(),
                legacy_status,
            )
            .await?;
    } else {
        store
            .patch_status::<L>(
                &legacy.namespace().unwrap_or_default(),
                &legacy.name_any(),
                replacing_patch(&current_status, &legacy_status),
            )
            .await?;
    }
    Ok(true)
}

/// Long poll for a settled pair.
pub(crate) fn long_poll<S: ObjectStore>(ctx: &Context<S>, kind: &str) -> Action {
    record_requeue(kind, "poll");
    Action::requeue(ctx.config.requeue)
}

/// Immediate retry after a write conflict.
pub(crate) fn immediate(kind: &str) -> Action {
    record_requeue(kind, "immediate");
    Action::requeue(Duration::from_secs(crate::constants::IMMEDIATE_REQUEUE_SECS))
}

/// Error policy shared by every migration controller.
pub fn migration_error_policy<K: Managed, S: ObjectStore>(
    obj: Arc<K>,
    err: &Error,
    ctx: Arc<Context<S>>,
) -> Action {
    let kind = K::kind(&()).to_string();
    record_error(&kind, &format!("{:?}", err.kind()));
    if matches!(err, Error::Cancelled) {
        return Action::await_change();
    }
    error!(
        kind = %kind,
        api_version = %K::api_version(&()),
        namespace = %obj.namespace().unwrap_or_default(),
        name = %obj.name_any(),
        error = %err,
        "Migration reconciliation failed"
    );
    record_requeue(&kind, "backoff");
    Action::requeue(ctx.config.backoff)
}
