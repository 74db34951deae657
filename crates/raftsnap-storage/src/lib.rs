//! Raftsnap Storage Library
//!
//! This crate provides the snapshot storage abstraction and its backends.
//! It includes the `SnapshotStore` trait and implementations for the local
//! filesystem and S3-compatible object storage.
//!
//! # Key format
//!
//! A key is the artifact path relative to the backend root: the relative file
//! path for the local backend, the object key for S3. Keys are opaque outside
//! the backend that produced them. Listing only returns keys that start with
//! the configured snapshot prefix, compared as a plain string, so a prefix such
//! as `vault/prod-` selects `vault/prod-01-01-2024-00-00-00.snap`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storages;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use raftsnap_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Settings, S3Storage};
pub use traits::{FileRecord, SnapshotReader, SnapshotStore, StorageError, StorageResult};
