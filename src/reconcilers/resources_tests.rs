// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the create-if-absent helper.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::opensearch_resources::build_external_service;
    use crate::test_support::{sample_cluster, FakeStore};
    use k8s_openapi::api::core::v1::Service;

    #[tokio::test]
    async fn test_creates_missing_object_once() {
        // Arrange
        let store = FakeStore::default();
        store.insert(&sample_cluster());
        let desired = build_external_service(&sample_cluster());

        // Act
        let first = create_if_absent(&store, "c1", &desired)
            .await
            .expect("create succeeds");
        let second = create_if_absent(&store, "c1", &desired)
            .await
            .expect("read succeeds");

        // Assert
        assert_eq!(first.metadata.uid, second.metadata.uid);
        assert_eq!(store.creates::<Service>("c1", "es-svc"), 1);
    }

    #[tokio::test]
    async fn test_existing_object_is_left_untouched() {
        // Arrange
        let store = FakeStore::default();
        let mut existing = build_external_service(&sample_cluster());
        existing
            .metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert("edited".to_string(), "by-user".to_string());
        store.insert(&existing);

        // Act
        let live = create_if_absent(&store, "c1", &build_external_service(&sample_cluster()))
            .await
            .expect("read succeeds");

        // Assert
        assert_eq!(
            live.metadata
                .labels
                .and_then(|l| l.get("edited").cloned())
                .as_deref(),
            Some("by-user")
        );
        assert_eq!(store.creates::<Service>("c1", "es-svc"), 0);
    }

    #[tokio::test]
    async fn test_create_failure_is_transient() {
        let store = FakeStore::default();
        store.insert(&sample_cluster());
        store.fail_next("create", "Service");

        let err = create_if_absent(&store, "c1", &build_external_service(&sample_cluster()))
            .await
            .expect_err("injected failure surfaces");

        assert_eq!(err.kind(), crate::errors::ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_missing_namespace_is_not_found() {
        let store = FakeStore::default();

        let err = create_if_absent(&store, "c1", &build_external_service(&sample_cluster()))
            .await
            .expect_err("namespace must exist");

        assert!(err.is_not_found());
    }
}
