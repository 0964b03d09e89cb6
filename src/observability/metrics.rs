//! Metrics registry
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::core::error::ErrorType;

/// Request pipeline counters
///
/// All counters use Relaxed atomics; a snapshot is not a consistent cut
/// across counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Requests handed to the dispatcher
    requests_handled: AtomicU64,
    /// Requests answered with a success response
    requests_succeeded: AtomicU64,
    rejected_bad_request: AtomicU64,
    rejected_unauthorized: AtomicU64,
    rejected_not_found: AtomicU64,
    failed_internal: AtomicU64,
    diffs_published: AtomicU64,
    diff_publish_failures: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests_handled(&self) {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an error response by class
    pub fn record_error(&self, error_type: ErrorType) {
        let counter = match error_type {
            ErrorType::BadRequest => &self.rejected_bad_request,
            ErrorType::Unauthorized => &self.rejected_unauthorized,
            ErrorType::NotFound => &self.rejected_not_found,
            ErrorType::InternalServer => &self.failed_internal,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_diffs_published(&self) {
        self.diffs_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_diff_publish_failures(&self) {
        self.diff_publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_handled: self.requests_handled.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            rejected_bad_request: self.rejected_bad_request.load(Ordering::Relaxed),
            rejected_unauthorized: self.rejected_unauthorized.load(Ordering::Relaxed),
            rejected_not_found: self.rejected_not_found.load(Ordering::Relaxed),
            failed_internal: self.failed_internal.load(Ordering::Relaxed),
            diffs_published: self.diffs_published.load(Ordering::Relaxed),
            diff_publish_failures: self.diff_publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_handled: u64,
    pub requests_succeeded: u64,
    pub rejected_bad_request: u64,
    pub rejected_unauthorized: u64,
    pub rejected_not_found: u64,
    pub failed_internal: u64,
    pub diffs_published: u64,
    pub diff_publish_failures: u64,
}

impl MetricsSnapshot {
    /// Error responses of every class
    pub fn errors(&self) -> u64 {
        self.rejected_bad_request + self.rejected_unauthorized + self.rejected_not_found + self.failed_internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_record_error_by_class() {
        let registry = MetricsRegistry::new();
        registry.record_error(ErrorType::NotFound);
        registry.record_error(ErrorType::NotFound);
        registry.record_error(ErrorType::Unauthorized);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.rejected_not_found, 2);
        assert_eq!(snapshot.rejected_unauthorized, 1);
        assert_eq!(snapshot.errors(), 3);
    }

    #[test]
    fn test_diff_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_diffs_published();
        registry.increment_diff_publish_failures();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.diffs_published, 1);
        assert_eq!(snapshot.diff_publish_failures, 1);
    }
}
