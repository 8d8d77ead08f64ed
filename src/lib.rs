// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # OpenSearch Operator for Kubernetes
//!
//! A Kubernetes operator written in Rust that manages the lifecycle of OpenSearch clusters
//! through Custom Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! This library provides the core functionality of the operator, including:
//!
//! - Custom Resource Definitions for clusters and security-plugin objects, served under
//!   both `opensearch.org/v1` and the legacy `opensearch.opster.io/v1`
//! - The cluster reconciler and its subreconcilers (TLS, configuration, workload,
//!   scaler, dashboards)
//! - A safe scale-down protocol that drains shards off a node before removing it
//! - Two-way migration between the legacy and the current API group
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`context`] - Shared context handed to every controller
//! - [`opensearch_resources`] - Builders for the Kubernetes objects of a cluster
//! - [`opensearch`] - Client for the engine's shard-allocation API
//! - [`store`] - Platform-API access used by the reconcilers
//!
//! ## Example
//!
//! ```rust,no_run
//! use opensearch_operator::crd::{GeneralConfig, NodePool, OpenSearchClusterSpec};
//!
//! let spec = OpenSearchClusterSpec {
//!     general: GeneralConfig {
//!         cluster_name: "logs".to_string(),
//!         service_name: "logs-svc".to_string(),
//!         version: Some("2.11.1".to_string()),
//!         ..Default::default()
//!     },
//!     node_pools: vec![NodePool {
//!         component: "masters".to_string(),
//!         replicas: 3,
//!         roles: vec!["master".to_string(), "data".to_string()],
//!         ..Default::default()
//!     }],
//!     security: None,
//!     dashboards: None,
//! };
//! ```

pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod events;
pub mod labels;
pub mod metrics;
pub mod opensearch;
pub mod opensearch_resources;
pub mod pki;
pub mod reconcilers;
pub mod store;

#[cfg(test)]
pub mod test_support;
