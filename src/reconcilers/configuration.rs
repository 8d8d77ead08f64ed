// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration subreconciler.
//!
//! Renders the accumulated `opensearch.yml` fragments plus the security plugin defaults
//! into the `{cluster}-config` config map, then hands the workload subreconciler a volume
//! and mount for it. The config map is created once and never rewritten.

use crate::context::Context;
use crate::crd::OpenSearchCluster;
use crate::errors::Result;
use crate::opensearch_resources::{
    build_config_map, config_volume, config_volume_mount, security_default_lines,
    target_namespace,
};
use crate::reconcilers::pass_context::{PassContext, Progress};
use crate::reconcilers::resources::create_if_absent;
use crate::store::ObjectStore;

/// Advance the configuration facet of a cluster.
///
/// # Errors
///
/// Returns a transient error when the config map cannot be read or created.
pub async fn reconcile_configuration<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    pass: &mut PassContext,
) -> Result<Progress> {
    let mut lines = pass.config_fragments.clone();
    lines.extend(security_default_lines());

    create_if_absent(
        &ctx.store,
        &target_namespace(cluster),
        &build_config_map(cluster, &lines),
    )
    .await?;

    pass.add_volume(config_volume(cluster), config_volume_mount());
    Ok(Progress::Done)
}
