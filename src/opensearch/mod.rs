// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Search-engine capability consumed by the scaler.
//!
//! The scaler only needs three shard-allocation verbs, modelled by [`ShardAllocation`].
//! [`OpenSearchClient`] implements them over the engine's REST API.

pub mod client;

pub use client::OpenSearchClient;

use crate::crd::OpenSearchCluster;
use crate::errors::Result;
use crate::opensearch_resources::target_namespace;
use async_trait::async_trait;

/// Where to reach a cluster's REST API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineEndpoint {
    /// Base URL without trailing slash, e.g. `https://es-svc.c1.svc.cluster.local:9200`
    pub base_url: String,
}

impl EngineEndpoint {
    /// Wrap an explicit base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// In-cluster address of a cluster's client service.
    #[must_use]
    pub fn for_cluster(cluster: &OpenSearchCluster) -> Self {
        let scheme = if cluster.spec.http_tls_enabled() {
            "https"
        } else {
            "http"
        };
        Self {
            base_url: format!(
                "{scheme}://{}.{}.svc.cluster.local:{}",
                cluster.spec.general.service_name,
                target_namespace(cluster),
                cluster.spec.http_port()
            ),
        }
    }
}

/// Shard-allocation verbs of the engine.
#[async_trait]
pub trait ShardAllocation: Send + Sync {
    /// Add `node` to the allocation exclude list. Returns whether the engine acknowledged.
    async fn append_exclude(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool>;

    /// Remove `node` from the allocation exclude list. Returns whether the engine acknowledged.
    async fn remove_exclude(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool>;

    /// Whether any shard is currently allocated on `node`.
    async fn has_shards_on(&self, endpoint: &EngineEndpoint, node: &str) -> Result<bool>;
}
