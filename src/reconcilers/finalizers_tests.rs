// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for finalizer helpers.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::OpenSearchCluster;
    use crate::store::ObjectStore;
    use crate::test_support::{sample_cluster, FakeStore};

    const FINALIZER: &str = "test.opensearch.org/finalizer";

    #[tokio::test]
    async fn test_ensure_finalizer_adds_once() {
        // Arrange
        let store = FakeStore::default();
        let cluster = store.insert(&sample_cluster());

        // Act
        let first = ensure_finalizer(&store, &cluster, FINALIZER)
            .await
            .expect("patch succeeds");
        let updated = store
            .object::<OpenSearchCluster>("c1", "c1")
            .expect("cluster exists");
        let second = ensure_finalizer(&store, &updated, FINALIZER)
            .await
            .expect("patch succeeds");

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(updated.finalizers(), &[FINALIZER.to_string()]);
    }

    #[tokio::test]
    async fn test_remove_finalizer_keeps_others() {
        let store = FakeStore::default();
        let mut cluster = sample_cluster();
        cluster.metadata.finalizers = Some(vec!["other".to_string(), FINALIZER.to_string()]);
        let cluster = store.insert(&cluster);

        let removed = remove_finalizer(&store, &cluster, FINALIZER)
            .await
            .expect("patch succeeds");

        assert!(removed);
        let updated = store
            .object::<OpenSearchCluster>("c1", "c1")
            .expect("cluster exists");
        assert_eq!(updated.finalizers(), &["other".to_string()]);
    }

    #[tokio::test]
    async fn test_removing_last_finalizer_releases_deleting_object() {
        // Arrange
        let store = FakeStore::default();
        let mut cluster = sample_cluster();
        cluster.metadata.finalizers = Some(vec![FINALIZER.to_string()]);
        store.insert(&cluster);
        store
            .delete::<OpenSearchCluster>("c1", "c1")
            .await
            .expect("delete succeeds");
        let deleting = store
            .object::<OpenSearchCluster>("c1", "c1")
            .expect("held by finalizer");
        assert!(is_deleting(&deleting));

        // Act
        remove_finalizer(&store, &deleting, FINALIZER)
            .await
            .expect("patch succeeds");

        // Assert
        assert!(store.object::<OpenSearchCluster>("c1", "c1").is_none());
    }

    #[tokio::test]
    async fn test_stale_add_conflicts_instead_of_dropping_other_finalizer() {
        // Arrange: two controllers read the same version
        let store = FakeStore::default();
        let cluster = store.insert(&sample_cluster());
        ensure_finalizer(&store, &cluster, "opensearch.org/migration")
            .await
            .expect("first writer succeeds");

        // Act: the second writer patches from its stale read
        let err = ensure_finalizer(&store, &cluster, FINALIZER)
            .await
            .expect_err("stale write is rejected");

        // Assert
        assert!(err.is_conflict());
        let updated = store
            .object::<OpenSearchCluster>("c1", "c1")
            .expect("cluster exists");
        assert_eq!(updated.finalizers(), &["opensearch.org/migration".to_string()]);

        // Act: a fresh read succeeds and keeps both
        ensure_finalizer(&store, &updated, FINALIZER)
            .await
            .expect("fresh write succeeds");
        let updated = store
            .object::<OpenSearchCluster>("c1", "c1")
            .expect("cluster exists");
        assert_eq!(
            updated.finalizers(),
            &["opensearch.org/migration".to_string(), FINALIZER.to_string()]
        );
    }

    #[tokio::test]
    async fn test_stale_remove_conflicts_instead_of_dropping_other_finalizer() {
        // Arrange
        let store = FakeStore::default();
        let mut cluster = sample_cluster();
        cluster.metadata.finalizers = Some(vec![FINALIZER.to_string()]);
        let stale = store.insert(&cluster);
        ensure_finalizer(&store, &stale, "other")
            .await
            .expect("concurrent add succeeds");

        // Act
        let err = remove_finalizer(&store, &stale, FINALIZER)
            .await
            .expect_err("stale write is rejected");

        // Assert
        assert!(err.is_conflict());
        let updated = store
            .object::<OpenSearchCluster>("c1", "c1")
            .expect("cluster exists");
        assert_eq!(
            updated.finalizers(),
            &[FINALIZER.to_string(), "other".to_string()]
        );
    }

    #[tokio::test]
    async fn test_remove_absent_finalizer_is_noop() {
        let store = FakeStore::default();
        let cluster = store.insert(&sample_cluster());

        let removed = remove_finalizer(&store, &cluster, FINALIZER)
            .await
            .expect("no patch needed");

        assert!(!removed);
    }
}
