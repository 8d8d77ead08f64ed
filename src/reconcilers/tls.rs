// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS subreconciler.
//!
//! For each engine interface (`transport`, `http`) with `generate: true`, ensures a
//! cluster CA secret and a per-interface node certificate secret exist, then contributes
//! the matching `opensearch.yml` lines, volume and mount to the pass context.
//!
//! Secrets are never rotated: an existing secret is reused verbatim. Externally provided
//! certificates (`generate: false`) are recognised but not supported.

use crate::constants::{TLS_INTERFACE_HTTP, TLS_INTERFACE_TRANSPORT};
use crate::context::Context;
use crate::crd::OpenSearchCluster;
use crate::errors::{Error, Result};
use crate::opensearch_resources::{
    build_ca_secret, build_cert_secret, ca_secret_name, cert_secret_name, certificate_sans,
    pem_pair_from_secret, target_namespace, tls_config_lines, tls_volume, tls_volume_mount,
};
use crate::pki::PemPair;
use crate::reconcilers::pass_context::{PassContext, Progress};
use crate::reconcilers::resources::create_if_absent;
use crate::store::ObjectStore;
use k8s_openapi::api::core::v1::Secret;
use tracing::debug;

/// Interfaces in the order their configuration is rendered.
const INTERFACES: [&str; 2] = [TLS_INTERFACE_TRANSPORT, TLS_INTERFACE_HTTP];

fn read_pem_pair(secret: &Secret, name: &str) -> Result<PemPair> {
    pem_pair_from_secret(secret)
        .ok_or_else(|| Error::Certificate(format!("secret '{name}' is missing tls.crt or tls.key")))
}

async fn ensure_ca<S: ObjectStore>(ctx: &Context<S>, cluster: &OpenSearchCluster) -> Result<PemPair> {
    let namespace = target_namespace(cluster);
    let name = ca_secret_name(cluster);
    if let Some(secret) = ctx.store.get::<Secret>(&namespace, &name).await? {
        return read_pem_pair(&secret, &name);
    }

    let ca = ctx.issuer.mint_ca(&cluster.spec.general.cluster_name)?;
    let live = create_if_absent(&ctx.store, &namespace, &build_ca_secret(cluster, &ca)).await?;
    read_pem_pair(&live, &name)
}

async fn ensure_node_cert<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    interface: &str,
    ca: &PemPair,
) -> Result<()> {
    let namespace = target_namespace(cluster);
    let name = cert_secret_name(cluster, interface);
    if ctx.store.get::<Secret>(&namespace, &name).await?.is_some() {
        debug!(namespace = %namespace, name = %name, "Reusing node certificate");
        return Ok(());
    }

    let node = ctx.issuer.mint_node_cert(
        ca,
        &cluster.spec.general.cluster_name,
        &certificate_sans(cluster),
    )?;
    create_if_absent(
        &ctx.store,
        &namespace,
        &build_cert_secret(cluster, interface, &node, ca),
    )
    .await?;
    Ok(())
}

/// Advance the TLS facet of a cluster.
///
/// # Errors
///
/// - [`Error::Unsupported`] when an interface asks for externally provided certificates
/// - a transient error when a secret cannot be read, minted or created
pub async fn reconcile_tls<S: ObjectStore>(
    ctx: &Context<S>,
    cluster: &OpenSearchCluster,
    pass: &mut PassContext,
) -> Result<Progress> {
    let Some(tls) = cluster.spec.tls() else {
        return Ok(Progress::Done);
    };

    let mut ca: Option<PemPair> = None;
    for interface in INTERFACES {
        let Some(config) = tls.interface(interface) else {
            continue;
        };
        if !config.generate {
            return Err(Error::Unsupported(format!(
                "externally provided certificates for the {interface} interface"
            )));
        }

        let ca_pair = match &ca {
            Some(pair) => pair.clone(),
            None => {
                let pair = ensure_ca(ctx, cluster).await?;
                ca = Some(pair.clone());
                pair
            }
        };
        ensure_node_cert(ctx, cluster, interface, &ca_pair).await?;

        pass.add_config_lines(tls_config_lines(cluster, interface));
        pass.add_volume(tls_volume(cluster, interface), tls_volume_mount(interface));
    }
    Ok(Progress::Done)
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tls_tests;
