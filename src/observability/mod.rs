//! # Observability
//!
//! Typed events emitted through `tracing`, and atomic counters for the
//! request pipeline.
//!
//! ```ignore
//! use entity_gateway::observability::{init_tracing, Event, MetricsRegistry};
//!
//! init_tracing("info")?;
//! tracing::info!(event = %Event::Serving, "gateway ready");
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_requests_handled();
//! ```

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{MetricsRegistry, MetricsSnapshot};

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Logs go to stderr so
/// stdout stays reserved for responses.
pub fn init_tracing(default_filter: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| format!("invalid log filter \"{}\": {}", default_filter, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| e.to_string())
}
