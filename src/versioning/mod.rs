//! # Version Diffs
//!
//! After a mutating request succeeds, the dispatcher turns the
//! (normalized request, response) pair into version diffs and hands each
//! one to a publisher, e.g. to fan out to realtime subscribers.

mod diff;
mod publisher;

pub use diff::{DefaultVersionDiffBuilder, VersionDiff, VersionDiffBuilder};
pub use publisher::{ChannelVersionDiffPublisher, DiffReceiver, DiffSender, VersionDiffPublisher};
