//! Observable gateway events
//!
//! Events are explicit and typed; each maps to a stable name used as the
//! `event` field of the emitted `tracing` record.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded
    ConfigLoaded,
    /// Dispatcher built and ready to serve
    Serving,
    /// Input exhausted, shutting down
    ShutdownComplete,

    // Request pipeline
    RequestReceived,
    RequestUnauthorized,
    ValidationFailed,
    RequestExecuted,
    RequestFailed,

    // Version diffs
    DiffPublished,
    DiffPublishFailed,

    // Sessions
    SessionExpired,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "GATEWAY_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::RequestReceived => "REQUEST_RECEIVED",
            Event::RequestUnauthorized => "REQUEST_UNAUTHORIZED",
            Event::ValidationFailed => "REQUEST_VALIDATION_FAILED",
            Event::RequestExecuted => "REQUEST_EXECUTED",
            Event::RequestFailed => "REQUEST_FAILED",

            Event::DiffPublished => "VERSION_DIFF_PUBLISHED",
            Event::DiffPublishFailed => "VERSION_DIFF_PUBLISH_FAILED",

            Event::SessionExpired => "SESSION_EXPIRED",
        }
    }

    /// Whether the event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::RequestUnauthorized | Event::ValidationFailed | Event::RequestFailed | Event::DiffPublishFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::RequestReceived.as_str(), "REQUEST_RECEIVED");
        assert_eq!(Event::DiffPublishFailed.to_string(), "VERSION_DIFF_PUBLISH_FAILED");
    }

    #[test]
    fn test_failure_classification() {
        assert!(Event::RequestFailed.is_failure());
        assert!(!Event::RequestExecuted.is_failure());
    }
}
