//! Raftsnap Infrastructure Library
//!
//! Process-level plumbing shared by the agent binary:
//! - Tracing subscriber setup (JSON or human-readable)
//! - Shutdown signal handling

pub mod shutdown;
pub mod telemetry;

pub use shutdown::{shutdown_signal, spawn_shutdown_listener};
pub use telemetry::init_telemetry;
