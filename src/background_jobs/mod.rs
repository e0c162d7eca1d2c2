//! Background sync scheduling.
//!
//! Jobs are registered once at startup; the scheduler runs them in passes on
//! a fixed interval or on demand.

mod job;
pub mod jobs;
mod scheduler;

pub use job::{BackgroundJob, JobError, JobOutcome};
pub use scheduler::{
    clamp_sync_interval, JobReport, PassReport, SyncScheduler, DEFAULT_SYNC_INTERVAL,
    MAX_SYNC_INTERVAL, MIN_SYNC_INTERVAL,
};
