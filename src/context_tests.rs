// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for context.rs

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::test_support::Harness;

    #[test]
    fn test_default_config() {
        let config = OperatorConfig::default();

        assert!(config.watch_namespace.is_none());
        assert_eq!(config.metrics_addr, METRICS_SERVER_ADDRESS);
        assert_eq!(config.requeue, Duration::from_secs(DEFAULT_REQUEUE_SECS));
        assert_eq!(config.backoff, Duration::from_secs(ERROR_REQUEUE_DURATION_SECS));
        assert!(config.migration_enabled);
    }

    #[test]
    fn test_cancellation_follows_shutdown_signal() {
        // Arrange
        let harness = Harness::new();
        assert!(!harness.ctx.is_cancelled());
        assert!(harness.ctx.check_cancelled().is_ok());

        // Act
        harness.shutdown.send(true).expect("receiver alive");

        // Assert
        assert!(harness.ctx.is_cancelled());
        assert!(matches!(harness.ctx.check_cancelled(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_deprecation_notice_fires_once_per_uid() {
        let harness = Harness::new();

        assert!(harness.ctx.first_deprecation_notice("uid-1"));
        assert!(!harness.ctx.first_deprecation_notice("uid-1"));
        assert!(harness.ctx.first_deprecation_notice("uid-2"));
    }

    #[test]
    fn test_forgotten_uid_is_noticed_again() {
        let harness = Harness::new();
        assert!(harness.ctx.first_deprecation_notice("uid-1"));

        harness.ctx.forget_deprecation_notice("uid-1");
        harness.ctx.forget_deprecation_notice("uid-unknown");

        assert!(harness.ctx.first_deprecation_notice("uid-1"));
    }

    #[tokio::test]
    async fn test_events_reach_the_sink() {
        let harness = Harness::new();
        let object_ref = ObjectReference {
            name: Some("c1".to_string()),
            ..Default::default()
        };

        harness
            .ctx
            .publish_warning(&object_ref, "Scaler", "Scale", "failed to remove node".to_string())
            .await;

        let events = harness.events.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].warning);
        assert_eq!(events[0].reason, "Scaler");
    }
}
