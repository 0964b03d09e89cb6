//! Version diff publishers

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use tokio::sync::mpsc;

use super::diff::VersionDiff;
use crate::core::error::{GatewayResult, ServerError};

/// Diff sender half
pub type DiffSender = mpsc::UnboundedSender<VersionDiff>;

/// Diff receiver half
pub type DiffReceiver = mpsc::UnboundedReceiver<VersionDiff>;

/// Sink for version diffs
pub trait VersionDiffPublisher: Send + Sync {
    fn publish(&self, diff: VersionDiff) -> BoxFuture<'_, GatewayResult<()>>;
}

/// Forwards diffs over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelVersionDiffPublisher {
    sender: DiffSender,
}

impl ChannelVersionDiffPublisher {
    /// Create a publisher and the receiver its diffs arrive on
    pub fn channel() -> (Self, DiffReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: DiffSender) -> Self {
        Self { sender }
    }
}

impl VersionDiffPublisher for ChannelVersionDiffPublisher {
    fn publish(&self, diff: VersionDiff) -> BoxFuture<'_, GatewayResult<()>> {
        let result = self
            .sender
            .send(diff)
            .map_err(|_| ServerError::internal("Version diff receiver dropped"));
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff() -> VersionDiff {
        VersionDiff {
            entity_name: "post".into(),
            id: "p1".into(),
            prev_version_id: "v1".into(),
            version_id: "v2".into(),
            operation: json!({"$set": {"a": 1}}),
        }
    }

    #[tokio::test]
    async fn test_publish_delivers() {
        let (publisher, mut rx) = ChannelVersionDiffPublisher::channel();
        publisher.publish(diff()).await.unwrap();

        assert_eq!(rx.recv().await, Some(diff()));
    }

    #[tokio::test]
    async fn test_publish_fails_without_receiver() {
        let (publisher, rx) = ChannelVersionDiffPublisher::channel();
        drop(rx);

        assert!(publisher.publish(diff()).await.is_err());
    }
}
