use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// What a job did when it completed without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job ran its work and wrote `count` items.
    Synced { count: usize },
    /// Nothing to do, the data was refreshed at `last_sync`.
    Fresh { last_sync: DateTime<Utc> },
}

/// Errors that can occur during job execution.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("A sync pass is already running")]
    AlreadyRunning,

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Trait for background jobs.
#[async_trait]
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Human-readable name for this job.
    fn name(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// Execute the job.
    async fn execute(&self) -> Result<JobOutcome, JobError>;
}
