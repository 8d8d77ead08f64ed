// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for forward migration.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::legacy;
    use crate::crd::OpenSearchCluster;
    use crate::labels::ANNOTATION_MIGRATION_SYNC;
    use crate::reconcilers::migration::specs_match;
    use crate::test_support::{sample_cluster, sample_legacy_cluster, FakeStore, Harness};
    use serde_json::json;

    type Legacy = legacy::OpenSearchCluster;

    async fn forward(harness: &Harness) -> Result<Action> {
        let Some(legacy) = harness.store().object::<Legacy>("c1", "c1") else {
            return Ok(Action::await_change());
        };
        reconcile_forward::<Legacy, OpenSearchCluster, FakeStore>(
            Arc::new(legacy),
            harness.ctx.clone(),
        )
        .await
    }

    fn current(harness: &Harness) -> Option<OpenSearchCluster> {
        harness.store().object::<OpenSearchCluster>("c1", "c1")
    }

    fn legacy_object(harness: &Harness) -> Option<Legacy> {
        harness.store().object::<Legacy>("c1", "c1")
    }

    #[tokio::test]
    async fn test_creates_current_copy_with_lineage() {
        // Arrange
        let harness = Harness::new();
        let seeded = harness.store().insert(&sample_legacy_cluster());

        // Act
        let action = forward(&harness).await.expect("forward pass");

        // Assert
        assert_eq!(action, Action::requeue(harness.ctx.config.requeue));
        let copy = current(&harness).expect("current copy created");
        assert!(specs_match(&copy, &seeded).expect("comparable"));
        let annotations = copy.annotations();
        assert_eq!(
            annotations.get(ANNOTATION_MIGRATED_FROM).map(String::as_str),
            Some(LEGACY_API_GROUP_VERSION)
        );
        assert_eq!(annotations.get(ANNOTATION_SOURCE_UID), seeded.uid().as_ref());
        assert!(annotations.contains_key(ANNOTATION_MIGRATION_TIMESTAMP));
        assert!(has_finalizer(&copy, FINALIZER_MIGRATION));

        let original = legacy_object(&harness).expect("legacy object kept");
        assert!(has_finalizer(&original, FINALIZER_MIGRATION));
        assert!(has_annotation(&original, ANNOTATION_MIGRATION_TIMESTAMP));
    }

    #[tokio::test]
    async fn test_legacy_spec_edit_propagates_with_sync_stamp() {
        // Arrange
        let harness = Harness::new();
        harness.store().insert(&sample_legacy_cluster());
        forward(&harness).await.expect("initial pass");
        let mut edited = legacy_object(&harness).expect("legacy exists");
        edited.spec.node_pools[0].replicas = 5;
        harness
            .ctx
            .store
            .replace("c1", &edited)
            .await
            .expect("legacy edited");

        // Act
        forward(&harness).await.expect("sync pass");

        // Assert
        let copy = current(&harness).expect("current exists");
        assert_eq!(copy.spec.node_pools[0].replicas, 5);
        assert!(has_annotation(&copy, ANNOTATION_MIGRATION_SYNC));
        assert_eq!(
            harness.store().creates::<OpenSearchCluster>("c1", "c1"),
            1
        );
    }

    #[tokio::test]
    async fn test_status_is_copied_back_to_legacy() {
        // Arrange
        let harness = Harness::new();
        harness.store().insert(&sample_legacy_cluster());
        forward(&harness).await.expect("initial pass");
        harness
            .ctx
            .store
            .patch_status::<OpenSearchCluster>("c1", "c1", json!({ "phase": "RUNNING" }))
            .await
            .expect("status written");

        // Act
        forward(&harness).await.expect("status pass");

        // Assert
        let status = legacy_object(&harness).and_then(|l| l.status).expect("legacy status");
        assert_eq!(status.phase, Some(crate::crd::ClusterPhase::Running));
    }

    #[tokio::test]
    async fn test_deleting_legacy_deletes_current_then_releases() {
        // Arrange
        let harness = Harness::new();
        harness.store().insert(&sample_legacy_cluster());
        forward(&harness).await.expect("initial pass");
        harness
            .ctx
            .store
            .delete::<Legacy>("c1", "c1")
            .await
            .expect("delete accepted");

        // Act
        let action = forward(&harness).await.expect("deletion pass");

        // Assert
        assert_eq!(action, Action::await_change());
        assert!(legacy_object(&harness).is_none());
        let copy = current(&harness).expect("held by its own finalizer");
        assert!(is_deleting(&copy));
    }

    #[tokio::test]
    async fn test_reverse_mirror_is_not_copied_forward() {
        // Arrange
        let harness = Harness::new();
        let mut mirror = sample_legacy_cluster();
        mirror.metadata.annotations = Some(
            [(
                ANNOTATION_REVERSE_MIGRATED_FROM.to_string(),
                crate::constants::API_GROUP_VERSION.to_string(),
            )]
            .into(),
        );
        harness.store().insert(&mirror);

        // Act
        forward(&harness).await.expect("forward pass");

        // Assert
        assert!(current(&harness).is_none());
        assert_eq!(harness.store().total_creates(), 0);
    }

    #[tokio::test]
    async fn test_independent_current_object_is_left_alone() {
        // Arrange
        let harness = Harness::new();
        harness.store().insert(&sample_legacy_cluster());
        let mut independent = sample_cluster();
        independent.spec.node_pools[0].replicas = 7;
        harness.store().insert(&independent);

        // Act
        forward(&harness).await.expect("forward pass");

        // Assert
        let copy = current(&harness).expect("current exists");
        assert_eq!(copy.spec.node_pools[0].replicas, 7);
        assert!(!has_annotation(&copy, ANNOTATION_MIGRATED_FROM));
        assert_eq!(harness.store().total_creates(), 0);
    }

    #[tokio::test]
    async fn test_deprecation_notice_is_recorded_once() {
        let harness = Harness::new();
        let seeded = harness.store().insert(&sample_legacy_cluster());

        forward(&harness).await.expect("forward pass");

        let uid = seeded.uid().expect("uid assigned");
        assert!(!harness.ctx.first_deprecation_notice(&uid));
    }

    #[tokio::test]
    async fn test_deleted_legacy_object_is_forgotten() {
        // Arrange
        let harness = Harness::new();
        let seeded = harness.store().insert(&sample_legacy_cluster());
        let uid = seeded.uid().expect("uid assigned");
        forward(&harness).await.expect("initial pass");
        harness
            .ctx
            .store
            .delete::<Legacy>("c1", "c1")
            .await
            .expect("delete accepted");

        // Act
        forward(&harness).await.expect("deletion pass");

        // Assert
        assert!(legacy_object(&harness).is_none());
        assert!(harness.ctx.first_deprecation_notice(&uid));
    }

    #[tokio::test]
    async fn test_transient_create_failure_is_retried() {
        // Arrange
        let harness = Harness::new();
        harness.store().insert(&sample_legacy_cluster());
        harness.store().fail_next("create", "OpenSearchCluster");

        // Act
        let err = forward(&harness).await.expect_err("create fails");
        forward(&harness).await.expect("retry succeeds");

        // Assert
        assert_eq!(err.kind(), crate::errors::ErrorKind::Transient);
        assert!(current(&harness).is_some());
        assert_eq!(harness.store().creates::<OpenSearchCluster>("c1", "c1"), 1);
    }
}
