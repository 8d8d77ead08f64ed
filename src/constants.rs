// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the OpenSearch operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group served by the current generation of CRDs
pub const API_GROUP: &str = "opensearch.org";

/// API group served by the legacy generation of CRDs
pub const LEGACY_API_GROUP: &str = "opensearch.opster.io";

/// API version shared by both groups
pub const API_VERSION: &str = "v1";

/// Fully qualified API version (group/version) of the current group
pub const API_GROUP_VERSION: &str = "opensearch.org/v1";

/// Fully qualified API version (group/version) of the legacy group
pub const LEGACY_API_GROUP_VERSION: &str = "opensearch.opster.io/v1";

/// Kind name for `OpenSearchCluster` resource
pub const KIND_OPENSEARCH_CLUSTER: &str = "OpenSearchCluster";

// ============================================================================
// OpenSearch Engine Constants
// ============================================================================

/// Default OpenSearch REST port
pub const DEFAULT_HTTP_PORT: i32 = 9200;

/// OpenSearch transport (node-to-node) port
pub const TRANSPORT_PORT: i32 = 9300;

/// Default OpenSearch Dashboards port
pub const DASHBOARDS_PORT: i32 = 5601;

/// Default engine version when the descriptor does not set one
pub const DEFAULT_OPENSEARCH_VERSION: &str = "2.11.1";

/// Default heap flags applied when a node pool sets no JVM options
pub const DEFAULT_JVM_OPTS: &str = "-Xmx512M -Xms512M";

/// Default persistent volume size per node
pub const DEFAULT_DISK_SIZE: &str = "30Gi";

/// Home directory of the engine inside its image
pub const OPENSEARCH_HOME: &str = "/usr/share/opensearch";

/// Engine configuration directory
pub const OPENSEARCH_CONFIG_DIR: &str = "/usr/share/opensearch/config";

/// Engine data directory
pub const OPENSEARCH_DATA_DIR: &str = "/usr/share/opensearch/data";

/// Name of the main engine configuration file
pub const OPENSEARCH_CONFIG_FILE: &str = "opensearch.yml";

/// Name of the dashboards configuration file
pub const DASHBOARDS_CONFIG_FILE: &str = "opensearch_dashboards.yml";

/// Name of the dashboards `ConfigMap` (one per namespace)
pub const DASHBOARDS_CONFIGMAP_NAME: &str = "opensearch-dashboards";

/// UID the engine process runs as inside the image
pub const OPENSEARCH_UID: i64 = 1000;

/// Image repository for the OpenSearch engine
pub const OPENSEARCH_IMAGE_REPOSITORY: &str = "docker.io/opensearchproject/opensearch";

/// Image repository for the Open Distro engine
pub const OPENDISTRO_IMAGE_REPOSITORY: &str = "docker.io/amazon/opendistro-for-elasticsearch";

/// Image repository for OpenSearch Dashboards
pub const DASHBOARDS_IMAGE_REPOSITORY: &str = "docker.io/opensearchproject/opensearch-dashboards";

/// Image used by the helper init containers
pub const INIT_HELPER_IMAGE: &str = "docker.io/busybox:1.36";

/// Kernel setting required by the engine's mmap store
pub const VM_MAX_MAP_COUNT: u64 = 262_144;

// ============================================================================
// TLS Constants
// ============================================================================

/// Interface name for node-to-node TLS
pub const TLS_INTERFACE_TRANSPORT: &str = "transport";

/// Interface name for REST TLS
pub const TLS_INTERFACE_HTTP: &str = "http";

/// Secret key holding a PEM certificate
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret key holding a PEM private key
pub const TLS_KEY_KEY: &str = "tls.key";

/// Secret key holding the issuing CA certificate
pub const TLS_CA_KEY: &str = "ca.crt";

// ============================================================================
// Kubernetes Health Check Constants
// ============================================================================

/// Readiness probe initial delay (the JVM takes a while to open the REST port)
pub const READINESS_INITIAL_DELAY_SECS: i32 = 30;

/// Readiness probe period
pub const READINESS_PERIOD_SECS: i32 = 10;

/// Readiness probe timeout
pub const READINESS_TIMEOUT_SECS: i32 = 5;

/// Readiness probe failure threshold
pub const READINESS_FAILURE_THRESHOLD: i32 = 6;

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Long poll between steady-state passes (30 seconds)
pub const DEFAULT_REQUEUE_SECS: u64 = 30;

/// Short backoff after a transient failure (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Delay for an "immediate" requeue while a multi-pass transition is in flight
pub const IMMEDIATE_REQUEUE_SECS: u64 = 1;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager / reporting controller name
pub const CONTROLLER_NAME: &str = "opensearch-operator";

/// Demo credentials shipped with the engine's security plugin
pub const DEFAULT_ENGINE_USERNAME: &str = "admin";

/// Demo credentials shipped with the engine's security plugin
pub const DEFAULT_ENGINE_PASSWORD: &str = "admin";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics HTTP server
pub const METRICS_SERVER_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
