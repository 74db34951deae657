//! Seams between the orchestrator and the cluster API.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::ClusterResult;

/// Answers "is this node allowed to write now".
#[async_trait]
pub trait LeadershipGate: Send + Sync {
    async fn is_leader(&self) -> ClusterResult<bool>;
}

/// Streams a point-in-time snapshot of cluster state.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Write the full snapshot into `sink` and return the number of bytes written.
    ///
    /// May run for a long time; callers cancel by dropping the future.
    async fn take_snapshot(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> ClusterResult<u64>;
}
