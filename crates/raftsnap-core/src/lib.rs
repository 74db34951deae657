//! Raftsnap Core Library
//!
//! This crate provides the configuration, error taxonomy and artifact naming
//! shared by every raftsnap component.

pub mod config;
pub mod error;
pub mod naming;
pub mod storage_types;

// Re-export commonly used types
pub use config::{ClusterConfig, Config, LogFormat, SnapshotConfig, StorageConfig};
pub use error::{AgentError, AgentResult, LogLevel};
pub use naming::{artifact_filename, SNAPSHOT_EXTENSION};
pub use storage_types::StorageBackend;
