// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` that contains:
//! - The platform object store
//! - The search-engine client used by the scaler
//! - The event sink and certificate issuer
//! - Operator configuration
//! - The shutdown signal that cancels in-flight passes

use crate::constants::{
    DEFAULT_ENGINE_PASSWORD, DEFAULT_ENGINE_USERNAME, DEFAULT_REQUEUE_SECS,
    ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_ADDRESS,
};
use crate::errors::{Error, Result};
use crate::events::EventSink;
use crate::opensearch::ShardAllocation;
use crate::pki::CertificateIssuer;
use crate::store::{KubeStore, ObjectStore};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Operator-wide settings, parsed from the command line and environment.
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Bind address of the metrics server
    pub metrics_addr: String,
    /// Username for the engine REST API
    pub engine_username: String,
    /// Password for the engine REST API
    pub engine_password: String,
    /// Accept self-signed engine certificates
    pub engine_insecure: bool,
    /// Delay between steady-state passes
    pub requeue: Duration,
    /// Delay after a transient failure
    pub backoff: Duration,
    /// Run the migration controllers
    pub migration_enabled: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            metrics_addr: METRICS_SERVER_ADDRESS.to_string(),
            engine_username: DEFAULT_ENGINE_USERNAME.to_string(),
            engine_password: DEFAULT_ENGINE_PASSWORD.to_string(),
            engine_insecure: true,
            requeue: Duration::from_secs(DEFAULT_REQUEUE_SECS),
            backoff: Duration::from_secs(ERROR_REQUEUE_DURATION_SECS),
            migration_enabled: true,
        }
    }
}

/// Shared context passed to all controllers.
pub struct Context<S: ObjectStore = KubeStore> {
    /// Platform object store
    pub store: S,

    /// Search-engine shard-allocation API
    pub engine: Arc<dyn ShardAllocation>,

    /// Kubernetes Event sink
    pub events: Arc<dyn EventSink>,

    /// Certificate minting for generated TLS
    pub issuer: Arc<dyn CertificateIssuer>,

    /// Operator configuration
    pub config: OperatorConfig,

    shutdown: watch::Receiver<bool>,

    /// Legacy objects whose deprecation warning was already logged, by uid
    deprecation_logged: Mutex<HashSet<String>>,
}

impl<S: ObjectStore> Context<S> {
    /// Assemble a context.
    pub fn new(
        store: S,
        engine: Arc<dyn ShardAllocation>,
        events: Arc<dyn EventSink>,
        issuer: Arc<dyn CertificateIssuer>,
        config: OperatorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            engine,
            events,
            issuer,
            config,
            shutdown,
            deprecation_logged: Mutex::new(HashSet::new()),
        }
    }

    /// Whether controller shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Fail with [`Error::Cancelled`] once shutdown has been requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] after shutdown.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Publish a Normal event.
    pub async fn publish_normal(
        &self,
        object_ref: &ObjectReference,
        reason: &str,
        action: &str,
        note: String,
    ) {
        self.events
            .publish(object_ref, EventType::Normal, reason, action, Some(note))
            .await;
    }

    /// Publish a Warning event.
    pub async fn publish_warning(
        &self,
        object_ref: &ObjectReference,
        reason: &str,
        action: &str,
        note: String,
    ) {
        self.events
            .publish(object_ref, EventType::Warning, reason, action, Some(note))
            .await;
    }

    /// Returns `true` the first time it is called for `uid` in this process.
    pub fn first_deprecation_notice(&self, uid: &str) -> bool {
        match self.deprecation_logged.lock() {
            Ok(mut seen) => seen.insert(uid.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(uid.to_string()),
        }
    }

    /// Forget `uid` once its legacy object is gone.
    pub fn forget_deprecation_notice(&self, uid: &str) {
        match self.deprecation_logged.lock() {
            Ok(mut seen) => seen.remove(uid),
            Err(poisoned) => poisoned.into_inner().remove(uid),
        };
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
