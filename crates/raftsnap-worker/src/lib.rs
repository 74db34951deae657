//! Snapshot orchestration for the raftsnap agent.
//!
//! Storage is the only coordination medium: every cycle re-reads artifact
//! timestamps from all backends to decide when the next snapshot is due, so
//! independent agents converge on the same schedule without talking to each
//! other.

pub mod orchestrator;
pub mod retention;
pub mod schedule;

pub use orchestrator::{
    CycleOutcome, OrchestratorConfig, SkipReason, SnapshotOrchestrator, UploadSummary,
    DEFAULT_SETTLE_DELAY,
};
pub use retention::{enforce_retention, RetentionPolicy, RetentionReport};
pub use schedule::{is_recent, ScheduleDecision, ScheduleSynchronizer};
