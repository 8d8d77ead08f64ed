// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry schedule for search-engine REST calls.
//!
//! Engine calls happen inside a reconcile pass, so the budget is short: a request that
//! keeps failing is handed back to the controller as a transient error and retried on
//! the next pass instead of blocking the worker.

use reqwest::StatusCode;
use std::time::{Duration, Instant};

/// First retry delay (50ms)
const INITIAL_INTERVAL: Duration = Duration::from_millis(50);

/// Ceiling on a single delay (2 seconds)
const MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Total retry budget (10 seconds)
const MAX_ELAPSED: Duration = Duration::from_secs(10);

/// Jitter applied to every delay (±10%)
const JITTER: f64 = 0.1;

/// Doubling, jittered delays for one engine request.
///
/// Roughly 50ms, 100ms, 200ms, 400ms, 800ms, 1.6s, then 2s intervals until 10 seconds
/// have elapsed.
#[derive(Debug)]
pub struct HttpBackoff {
    next: Duration,
    started: Instant,
}

impl Default for HttpBackoff {
    fn default() -> Self {
        Self {
            next: INITIAL_INTERVAL,
            started: Instant::now(),
        }
    }
}

impl HttpBackoff {
    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= MAX_ELAPSED {
            return None;
        }
        let delay = jittered(self.next);
        self.next = (self.next * 2).min(MAX_INTERVAL);
        Some(delay)
    }

    /// Time spent since the first attempt.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

fn jittered(interval: Duration) -> Duration {
    let secs = interval.as_secs_f64();
    let delta = secs * JITTER;
    Duration::from_secs_f64(rand::random_range((secs - delta)..=(secs + delta)).max(0.0))
}

/// Backoff used for search-engine REST calls.
#[must_use]
pub fn http_backoff() -> HttpBackoff {
    HttpBackoff::default()
}

/// Whether an engine response status is worth retrying.
///
/// Rate limiting (429) and gateway or server errors (500, 502, 503, 504) are; a 503 is
/// what a cluster without an elected master answers.
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
