// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse migration: current-group object → legacy mirror.

use super::{
    build_mirror, has_annotation, immediate, long_poll, now_rfc3339, sync_spec, sync_status,
    REVERSE,
};
use crate::constants::API_GROUP_VERSION;
use crate::context::Context;
use crate::errors::Result;
use crate::labels::{
    ANNOTATION_MIGRATED_FROM, ANNOTATION_MIGRATION_TIMESTAMP, ANNOTATION_REVERSE_MIGRATED_FROM,
    ANNOTATION_SOURCE_UID, FINALIZER_MIGRATION,
};
use crate::metrics::{
    record_migration_action, record_reconciliation_error, record_reconciliation_success,
};
use crate::reconcilers::finalizers::{ensure_finalizer, has_finalizer, is_deleting, remove_finalizer};
use crate::store::{Managed, ObjectStore};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Reconcile a current-group object of kind `C` against its legacy counterpart `L`.
///
/// # Errors
///
/// Returns transient store errors for the error policy to back off on.
pub async fn reconcile_reverse<C, L, S>(current: Arc<C>, ctx: Arc<Context<S>>) -> Result<Action>
where
    C: Managed,
    L: Managed,
    S: ObjectStore,
{
    let start = Instant::now();
    let kind = C::kind(&()).to_string();
    let result = match reverse_pass::<C, L, S>(&current, &ctx, &kind).await {
        Err(e) if e.is_conflict() => {
            debug!(kind = %kind, error = %e, "Conflict during reverse migration, retrying");
            Ok(immediate(&kind))
        }
        other => other,
    };
    match &result {
        Ok(_) => record_reconciliation_success(&kind, start.elapsed()),
        Err(_) => record_reconciliation_error(&kind, start.elapsed()),
    }
    result
}

async fn reverse_pass<C, L, S>(requested: &C, ctx: &Context<S>, kind: &str) -> Result<Action>
where
    C: Managed,
    L: Managed,
    S: ObjectStore,
{
    let namespace = requested.namespace().unwrap_or_default();
    let name = requested.name_any();
    let Some(current) = ctx.store.get::<C>(&namespace, &name).await? else {
        return Ok(Action::await_change());
    };

    if is_deleting(&current) {
        return reverse_delete::<C, L, S>(ctx, &current, kind).await;
    }
    ctx.check_cancelled()?;
    ensure_finalizer(&ctx.store, &current, FINALIZER_MIGRATION).await?;

    let legacy = ctx.store.get::<L>(&namespace, &name).await?;

    if has_annotation(&current, ANNOTATION_MIGRATED_FROM) {
        // Produced by forward migration: the legacy side is authoritative.
        if let Some(legacy) = legacy {
            ctx.check_cancelled()?;
            sync_status(&ctx.store, &current, &legacy).await?;
        }
        return Ok(long_poll(ctx, kind));
    }

    match legacy {
        None => {
            let lineage = [
                (ANNOTATION_REVERSE_MIGRATED_FROM, API_GROUP_VERSION.to_string()),
                (ANNOTATION_MIGRATION_TIMESTAMP, now_rfc3339()),
                (ANNOTATION_SOURCE_UID, current.uid().unwrap_or_default()),
            ];
            let mirror: L = build_mirror(&current, &lineage)?;
            ctx.check_cancelled()?;
            ctx.store.create(&namespace, &mirror).await?;
            info!(
                kind = %kind,
                namespace = %namespace,
                name = %name,
                "Created {} mirror",
                L::api_version(&())
            );
            record_migration_action(kind, REVERSE, "create");
        }
        Some(legacy) if has_annotation(&legacy, ANNOTATION_REVERSE_MIGRATED_FROM) => {
            ctx.check_cancelled()?;
            if sync_spec(&ctx.store, &current, &legacy).await? {
                info!(kind = %kind, namespace = %namespace, name = %name, "Copied spec to legacy mirror");
                record_migration_action(kind, REVERSE, "sync");
            }
            let legacy = ctx.store.get::<L>(&namespace, &name).await?;
            if let Some(legacy) = legacy {
                sync_status(&ctx.store, &current, &legacy).await?;
            }
        }
        Some(_) => {
            debug!(kind = %kind, namespace = %namespace, name = %name, "Independent legacy object shares the name, leaving it alone");
        }
    }
    Ok(long_poll(ctx, kind))
}

/// Delete the legacy mirror if this side produced it, then release the current object.
async fn reverse_delete<C, L, S>(ctx: &Context<S>, current: &C, kind: &str) -> Result<Action>
where
    C: Managed,
    L: Managed,
    S: ObjectStore,
{
    if !has_finalizer(current, FINALIZER_MIGRATION) {
        return Ok(Action::await_change());
    }
    let namespace = current.namespace().unwrap_or_default();
    let name = current.name_any();
    ctx.check_cancelled()?;

    if let Some(legacy) = ctx.store.get::<L>(&namespace, &name).await? {
        if has_annotation(&legacy, ANNOTATION_REVERSE_MIGRATED_FROM) && !is_deleting(&legacy) {
            ctx.store.delete::<L>(&namespace, &name).await?;
            info!(kind = %kind, namespace = %namespace, name = %name, "Deleted legacy mirror");
            record_migration_action(kind, REVERSE, "delete");
        }
    }
    remove_finalizer(&ctx.store, current, FINALIZER_MIGRATION).await?;
    Ok(Action::await_change())
}

#[cfg(test)]
#[path = "reverse_tests.rs"]
mod reverse_tests;
