// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes Event emission.
//!
//! Reconcilers report per-operation progress (scaler steps, phase errors) as Events on
//! the cluster descriptor, visible through `kubectl describe`. Publishing is
//! fire-and-forget: a failed event is logged and never fails a pass.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Capability to publish Kubernetes Events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish an event on `object_ref`. Never fails.
    async fn publish(
        &self,
        object_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// [`EventSink`] backed by `kube::runtime::events::Recorder`.
pub struct KubeEventSink {
    recorder: Recorder,
}

impl KubeEventSink {
    /// Create a sink reporting as `controller_name`.
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn publish(
        &self,
        object_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, object_ref).await {
            warn!(reason, action, error = %e, "Failed to publish Kubernetes event");
        }
    }
}

/// Event reason strings (REASON column of `kubectl get events`).
pub mod reasons {
    /// Scale-up/scale-down protocol steps
    pub const SCALER: &str = "Scaler";
    /// Descriptor failed validation or requested an unsupported mode
    pub const UNSUPPORTED: &str = "Unsupported";
    /// Cluster is stuck in the ERROR phase
    pub const CLUSTER_ERROR: &str = "ClusterError";
}

/// Event action strings (ACTION column of `kubectl get events`).
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
    /// Pod-set replica change
    pub const SCALE: &str = "Scale";
}

/// Scaler event messages.
pub mod messages {
    pub const ADDED_NODE: &str = "added node";
    pub const EXCLUDED_NODE: &str = "excluded node";
    pub const DRAINING_NODE: &str = "draining node";
    pub const NODE_DRAINED: &str = "node has drained";
    pub const REMOVED_NODE: &str = "removed node";
    pub const FAILED_TO_EXCLUDE: &str = "failed to exclude node";
    pub const FAILED_TO_REMOVE: &str = "failed to remove node";
}
