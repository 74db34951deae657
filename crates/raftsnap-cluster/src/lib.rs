//! Cluster API client for the raftsnap agent.
//!
//! Wraps the consensus cluster's HTTP API (Vault integrated storage) behind two
//! narrow seams the orchestrator depends on:
//!
//! - [`LeadershipGate`]: "is this node allowed to write now"
//! - [`SnapshotSource`]: stream a point-in-time snapshot into a byte sink
//!
//! Both retry exactly once after re-authenticating when a call fails with an
//! authentication-class error (see [`with_reauth`]).

pub mod auth;
pub mod client;
pub mod error;
pub mod retry;
pub mod traits;

pub use auth::{Authenticate, Credentials};
pub use client::{ClientOptions, ClusterClient, LeaderStatus};
pub use error::{ClusterError, ClusterResult};
pub use retry::{with_reauth, MAX_ATTEMPTS};
pub use traits::{LeadershipGate, SnapshotSource};
