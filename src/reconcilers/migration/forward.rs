// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Forward migration: legacy object → current-group copy.

use super::{
    build_mirror, has_annotation, immediate, long_poll, now_rfc3339, sync_spec, sync_status,
    FORWARD,
};
use crate::constants::LEGACY_API_GROUP_VERSION;
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
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reconcile a legacy object of kind `L` against its current-group counterpart `C`.
///
/// # Errors
///
/// Returns transient store errors for the error policy to back off on.
pub async fn reconcile_forward<L, C, S>(legacy: Arc<L>, ctx: Arc<Context<S>>) -> Result<Action>
where
    L: Managed,
    C: Managed,
    S: ObjectStore,
{
    let start = Instant::now();
    let kind = L::kind(&()).to_string();
    let result = match forward_pass::<L, C, S>(&legacy, &ctx, &kind).await {
        Err(e) if e.is_conflict() => {
            debug!(kind = %kind, error = %e, "Conflict during forward migration, retrying");
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

async fn forward_pass<L, C, S>(requested: &L, ctx: &Context<S>, kind: &str) -> Result<Action>
where
    L: Managed,
    C: Managed,
    S: ObjectStore,
{
    let namespace = requested.namespace().unwrap_or_default();
    let name = requested.name_any();
    let Some(legacy) = ctx.store.get::<L>(&namespace, &name).await? else {
        return Ok(Action::await_change());
    };

    let mirrored = has_annotation(&legacy, ANNOTATION_REVERSE_MIGRATED_FROM);
    if !mirrored {
        if let Some(uid) = legacy.uid() {
            if ctx.first_deprecation_notice(&uid) {
                warn!(
                    kind = %kind,
                    namespace = %namespace,
                    name = %name,
                    "{} is deprecated; it is being migrated to {}",
                    L::api_version(&()),
                    C::api_version(&())
                );
            }
        }
    }

    if is_deleting(&legacy) {
        return forward_delete::<L, C, S>(ctx, &legacy, kind).await;
    }
    ctx.check_cancelled()?;
    ensure_finalizer(&ctx.store, &legacy, FINALIZER_MIGRATION).await?;

    let Some(current) = ctx.store.get::<C>(&namespace, &name).await? else {
        if mirrored {
            debug!(kind = %kind, namespace = %namespace, name = %name, "Mirror without a current object, waiting for its deletion");
        } else if has_annotation(&legacy, ANNOTATION_MIGRATION_TIMESTAMP) {
            debug!(kind = %kind, namespace = %namespace, name = %name, "Current copy was deleted, not recreating");
        } else {
            create_current::<L, C, S>(ctx, &legacy, kind).await?;
        }
        return Ok(long_poll(ctx, kind));
    };

    if has_annotation(&current, ANNOTATION_MIGRATED_FROM) {
        if !has_annotation(&legacy, ANNOTATION_MIGRATION_TIMESTAMP) {
            stamp_migrated(ctx, &legacy).await?;
        }
        ctx.check_cancelled()?;
        if sync_spec(&ctx.store, &legacy, &current).await? {
            info!(kind = %kind, namespace = %namespace, name = %name, "Copied legacy spec to current object");
            record_migration_action(kind, FORWARD, "sync");
        }
    } else if !mirrored {
        debug!(kind = %kind, namespace = %namespace, name = %name, "Independent objects share a name, leaving both alone");
        return Ok(long_poll(ctx, kind));
    }

    ctx.check_cancelled()?;
    sync_status(&ctx.store, &current, &legacy).await?;
    Ok(long_poll(ctx, kind))
}

async fn create_current<L, C, S>(ctx: &Context<S>, legacy: &L, kind: &str) -> Result<()>
where
    L: Managed,
    C: Managed,
    S: ObjectStore,
{
    let namespace = legacy.namespace().unwrap_or_default();
    let lineage = [
        (ANNOTATION_MIGRATED_FROM, LEGACY_API_GROUP_VERSION.to_string()),
        (ANNOTATION_MIGRATION_TIMESTAMP, now_rfc3339()),
        (ANNOTATION_SOURCE_UID, legacy.uid().unwrap_or_default()),
    ];
    let current: C = build_mirror(legacy, &lineage)?;
    ctx.check_cancelled()?;
    ctx.store.create(&namespace, &current).await?;
    info!(
        kind = %kind,
        namespace = %namespace,
        name = %legacy.name_any(),
        "Created {} copy of legacy object",
        C::api_version(&())
    );
    record_migration_action(kind, FORWARD, "create");
    stamp_migrated(ctx, legacy).await
}

/// Mark the legacy object as migrated, so a deleted copy is not created again.
async fn stamp_migrated<L: Managed, S: ObjectStore>(ctx: &Context<S>, legacy: &L) -> Result<()> {
    let patch = json!({
        "metadata": { "annotations": { ANNOTATION_MIGRATION_TIMESTAMP: now_rfc3339() } }
    });
    ctx.store
        .patch_merge::<L>(
            &legacy.namespace().unwrap_or_default(),
            &legacy.name_any(),
            patch,
        )
        .await
}

/// Delete the current counterpart, then release the legacy object.
async fn forward_delete<L, C, S>(ctx: &Context<S>, legacy: &L, kind: &str) -> Result<Action>
where
    L: Managed,
    C: Managed,
    S: ObjectStore,
{
    if !has_finalizer(legacy, FINALIZER_MIGRATION) {
        return Ok(Action::await_change());
    }
    let namespace = legacy.namespace().unwrap_or_default();
    let name = legacy.name_any();
    ctx.check_cancelled()?;

    if let Some(current) = ctx.store.get::<C>(&namespace, &name).await? {
        if !is_deleting(&current) {
            ctx.store.delete::<C>(&namespace, &name).await?;
            info!(kind = %kind, namespace = %namespace, name = %name, "Deleted current counterpart of legacy object");
            record_migration_action(kind, FORWARD, "delete");
        }
    }
    remove_finalizer(&ctx.store, legacy, FINALIZER_MIGRATION).await?;
    if let Some(uid) = legacy.uid() {
        ctx.forget_deprecation_notice(&uid);
    }
    Ok(Action::await_change())
}

#[cfg(test)]
#[path = "forward_tests.rs"]
mod forward_tests;
