// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-pass accumulator threaded through the subreconcilers.
//!
//! A fresh [`PassContext`] is created for every pass of the cluster reconciler and
//! borrowed mutably by each subreconciler in turn. Earlier subreconcilers contribute
//! volumes, mounts and `opensearch.yml` fragments that later ones consume (the TLS
//! subreconciler feeds the configuration subreconciler, both feed the workload
//! subreconciler). Status changes are recorded as deltas and applied once at the end of
//! the pass.

use crate::crd::ComponentStatus;
use k8s_openapi::api::core::v1::{Volume, VolumeMount};

/// What a subreconciler wants from the scheduler once the pass is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Nothing further to do until the next poll.
    Done,
    /// A multi-pass transition is in flight; come back immediately.
    Requeue,
}

impl Progress {
    /// Combine two outcomes; any requeue wins.
    #[must_use]
    pub fn and(self, other: Progress) -> Progress {
        if self == Progress::Requeue || other == Progress::Requeue {
            Progress::Requeue
        } else {
            Progress::Done
        }
    }
}

/// A change to `status.componentsStatus`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusDelta {
    /// Insert or overwrite a row.
    Upsert(ComponentStatus),
    /// Drop a row if present.
    Remove {
        component: String,
        description: String,
    },
}

/// Accumulator for a single reconcile pass.
#[derive(Clone, Debug, Default)]
pub struct PassContext {
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub config_fragments: Vec<String>,
    status_deltas: Vec<StatusDelta>,
}

impl PassContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pod volume together with the engine container's mount of it.
    pub fn add_volume(&mut self, volume: Volume, mount: VolumeMount) {
        self.volumes.push(volume);
        self.volume_mounts.push(mount);
    }

    /// Append lines to the rendered `opensearch.yml`.
    pub fn add_config_lines<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.config_fragments.extend(lines);
    }

    pub fn upsert_status(&mut self, row: ComponentStatus) {
        self.status_deltas.push(StatusDelta::Upsert(row));
    }

    pub fn remove_status(&mut self, component: &str, description: &str) {
        self.status_deltas.push(StatusDelta::Remove {
            component: component.to_string(),
            description: description.to_string(),
        });
    }

    /// Status deltas in the order they were recorded.
    #[must_use]
    pub fn status_deltas(&self) -> &[StatusDelta] {
        &self.status_deltas
    }
}
