// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_delays_double_within_jitter_and_cap_at_two_seconds() {
        // Arrange
        let mut backoff = http_backoff();
        let expected_ms = [50u64, 100, 200, 400, 800, 1600, 2000, 2000];

        // Act & Assert
        for expected in expected_ms {
            let delay = backoff.next_backoff().expect("within budget");
            let low = Duration::from_millis(expected * 9 / 10);
            let high = Duration::from_millis(expected * 11 / 10);
            assert!(
                delay >= low && delay <= high,
                "{delay:?} outside {low:?}..={high:?}"
            );
        }
    }

    #[test]
    fn test_budget_is_spent_after_ten_seconds() {
        let mut backoff = HttpBackoff {
            next: INITIAL_INTERVAL,
            started: Instant::now()
                .checked_sub(MAX_ELAPSED)
                .expect("clock is past ten seconds"),
        };

        assert_eq!(backoff.next_backoff(), None);
        assert!(backoff.elapsed() >= MAX_ELAPSED);
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            assert!(is_retryable_http_status(status), "{status} should retry");
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
        ] {
            assert!(!is_retryable_http_status(status), "{status} should not retry");
        }
    }
}
