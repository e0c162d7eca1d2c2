//! Interval scheduler for the sync jobs.
//!
//! A pass runs every registered job once, one after another. Passes never
//! overlap: a pass requested while another is in flight is rejected, not queued.

use super::job::{BackgroundJob, JobError, JobOutcome};
use crate::server::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);
pub const MAX_SYNC_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Clamps an interval to `[MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL]`.
pub fn clamp_sync_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL)
}

/// Result of one job within a pass.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: String,
    /// `synced`, `fresh` or `failed`.
    pub status: &'static str,
    pub items_count: Option<usize>,
    pub last_sync: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub triggered_by: String,
    pub started_at: DateTime<Utc>,
    pub jobs: Vec<JobReport>,
}

impl PassReport {
    pub fn failed_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| j.status == "failed").count()
    }
}

/// Clears the in-progress flag when the pass ends, panics included.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SchedulerInner {
    jobs: Vec<Arc<dyn BackgroundJob>>,
    sync_in_progress: AtomicBool,
    interval: Mutex<Duration>,
    /// Cancels the running timer task. `Some` while started.
    timer: Mutex<Option<CancellationToken>>,
}

/// Handle to the sync scheduler. Clones share the same state.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>,
}

impl SyncScheduler {
    pub fn new(jobs: Vec<Arc<dyn BackgroundJob>>, interval: Duration) -> Self {
        for job in &jobs {
            info!("Registering job: {} - {}", job.id(), job.description());
        }
        Self {
            inner: Arc::new(SchedulerInner {
                jobs,
                sync_in_progress: AtomicBool::new(false),
                interval: Mutex::new(clamp_sync_interval(interval)),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn job_ids(&self) -> Vec<&'static str> {
        self.inner.jobs.iter().map(|job| job.id()).collect()
    }

    /// Runs a pass right away, then every `sync_interval`.
    /// Returns false when already started.
    pub fn start(&self) -> bool {
        let mut timer = lock(&self.inner.timer);
        if timer.is_some() {
            warn!("Sync scheduler already started");
            return false;
        }

        let interval = self.sync_interval();
        let token = CancellationToken::new();
        self.spawn_timer(token.clone(), interval, true);
        *timer = Some(token);

        info!(
            "Sync scheduler started with {} jobs, interval {:?}",
            self.inner.jobs.len(),
            interval
        );
        true
    }

    /// Disarms the timer. A pass already in flight runs to completion.
    pub fn stop(&self) {
        if let Some(token) = lock(&self.inner.timer).take() {
            token.cancel();
            info!("Sync scheduler stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        lock(&self.inner.timer).is_some()
    }

    pub fn is_sync_in_progress(&self) -> bool {
        self.inner.sync_in_progress.load(Ordering::Acquire)
    }

    pub fn sync_interval(&self) -> Duration {
        *lock(&self.inner.interval)
    }

    /// Sets the interval, clamped to [`MIN_SYNC_INTERVAL`] and
    /// [`MAX_SYNC_INTERVAL`], and re-arms the timer if started. Returns the
    /// interval in effect.
    pub fn set_sync_interval(&self, interval: Duration) -> Duration {
        let effective = clamp_sync_interval(interval);
        if effective != interval {
            warn!(
                "Sync interval {:?} is out of range, using {:?}",
                interval, effective
            );
        }
        *lock(&self.inner.interval) = effective;

        let mut timer = lock(&self.inner.timer);
        if let Some(old) = timer.take() {
            old.cancel();
            let token = CancellationToken::new();
            self.spawn_timer(token.clone(), effective, false);
            *timer = Some(token);
            info!("Sync timer re-armed with interval {:?}", effective);
        }

        effective
    }

    /// Scheduled pass. Fails with [`JobError::AlreadyRunning`] when a pass is in flight.
    pub async fn run_sync(&self) -> Result<PassReport, JobError> {
        self.run_pass("schedule").await
    }

    /// On-demand pass, same exclusivity as [`run_sync`](Self::run_sync).
    pub async fn manual_sync(&self) -> Result<PassReport, JobError> {
        info!("Manual sync requested");
        self.run_pass("manual").await
    }

    fn spawn_timer(&self, token: CancellationToken, period: Duration, run_immediately: bool) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let now = Instant::now();
            let first_tick = if run_immediately {
                now
            } else {
                now.checked_add(period).unwrap_or(now)
            };
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Sync timer cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Detached so stopping the timer never aborts a pass.
                        let scheduler = scheduler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = scheduler.run_sync().await {
                                warn!("Skipping scheduled sync pass: {}", e);
                            }
                        });
                    }
                }
            }
        });
    }

    async fn run_pass(&self, triggered_by: &str) -> Result<PassReport, JobError> {
        let Some(_guard) = PassGuard::acquire(&self.inner.sync_in_progress) else {
            warn!("Sync pass ({}) rejected, another pass is running", triggered_by);
            return Err(JobError::AlreadyRunning);
        };

        let started_at = Utc::now();
        info!(
            "Starting sync pass ({}) with {} jobs",
            triggered_by,
            self.inner.jobs.len()
        );

        let mut reports = Vec::with_capacity(self.inner.jobs.len());
        for job in &self.inner.jobs {
            reports.push(Self::run_job(Arc::clone(job)).await);
        }

        let report = PassReport {
            triggered_by: triggered_by.to_string(),
            started_at,
            jobs: reports,
        };
        info!(
            "Sync pass ({}) finished, {} of {} jobs failed",
            triggered_by,
            report.failed_jobs(),
            report.jobs.len()
        );
        Ok(report)
    }

    /// Runs one job in its own task so a panic stays contained.
    async fn run_job(job: Arc<dyn BackgroundJob>) -> JobReport {
        let job_id = job.id();
        metrics::set_job_running(job_id, true);
        let start_time = std::time::Instant::now();

        let result = tokio::spawn(async move { job.execute().await }).await;
        let elapsed = start_time.elapsed();

        let mut report = JobReport {
            job_id: job_id.to_string(),
            status: "failed",
            items_count: None,
            last_sync: None,
            error: None,
            duration_ms: elapsed.as_millis() as u64,
        };
        let status_label = match result {
            Ok(Ok(JobOutcome::Synced { count })) => {
                info!("Job {} synced {} items in {:?}", job_id, count, elapsed);
                report.status = "synced";
                report.items_count = Some(count);
                "success"
            }
            Ok(Ok(JobOutcome::Fresh { last_sync })) => {
                report.status = "fresh";
                report.last_sync = Some(last_sync);
                "skipped"
            }
            Ok(Err(e)) => {
                error!("Job {} failed after {:?}: {}", job_id, elapsed, e);
                report.error = Some(e.to_string());
                "failed"
            }
            Err(e) => {
                error!("Job {} panicked after {:?}: {}", job_id, elapsed, e);
                report.error = Some(format!("Task panic: {}", e));
                "panic"
            }
        };

        metrics::record_job_execution(job_id, status_label);
        metrics::set_job_running(job_id, false);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_jobs::jobs::{ItemSyncJob, DEFAULT_STALE_AFTER};
    use crate::category::ItemCategory;
    use crate::item_store::SqliteItemStore;
    use crate::public_data::fake_source::{found, FakeItemSource};
    use crate::sync::{ItemSynchronizer, DEFAULT_BATCH_SIZE};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct TestJob {
        id: &'static str,
        behavior: Behavior,
        delay: Duration,
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    impl TestJob {
        fn new(id: &'static str, behavior: Behavior, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                id,
                behavior,
                delay,
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        fn finished(&self) -> usize {
            self.finished.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackgroundJob for TestJob {
        fn id(&self) -> &'static str {
            self.id
        }

        fn name(&self) -> &'static str {
            "Test Job"
        }

        fn description(&self) -> &'static str {
            "A test job"
        }

        async fn execute(&self) -> Result<JobOutcome, JobError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(JobOutcome::Synced { count: 1 }),
                Behavior::Fail => Err(JobError::ExecutionFailed("boom".to_string())),
                Behavior::Panic => panic!("job panicked"),
            }
        }
    }

    fn scheduler_with(jobs: Vec<Arc<TestJob>>) -> SyncScheduler {
        let jobs = jobs
            .into_iter()
            .map(|job| job as Arc<dyn BackgroundJob>)
            .collect();
        SyncScheduler::new(jobs, DEFAULT_SYNC_INTERVAL)
    }

    #[tokio::test]
    async fn test_run_sync_runs_every_job() {
        let a = TestJob::new("a", Behavior::Succeed, Duration::ZERO);
        let b = TestJob::new("b", Behavior::Succeed, Duration::ZERO);
        let scheduler = scheduler_with(vec![a.clone(), b.clone()]);

        let report = scheduler.run_sync().await.unwrap();

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.triggered_by, "schedule");
        assert_eq!(a.finished(), 1);
        assert_eq!(b.finished(), 1);
        assert!(!scheduler.is_sync_in_progress());
    }

    #[tokio::test]
    async fn test_failure_and_panic_do_not_stop_the_pass() {
        let failing = TestJob::new("failing", Behavior::Fail, Duration::ZERO);
        let panicking = TestJob::new("panicking", Behavior::Panic, Duration::ZERO);
        let healthy = TestJob::new("healthy", Behavior::Succeed, Duration::ZERO);
        let scheduler = scheduler_with(vec![failing, panicking, healthy.clone()]);

        let report = scheduler.manual_sync().await.unwrap();

        assert_eq!(healthy.finished(), 1);
        assert_eq!(report.failed_jobs(), 2);
        assert_eq!(report.jobs[0].error.as_deref(), Some("Execution failed: boom"));
        assert!(report.jobs[1].error.as_ref().unwrap().starts_with("Task panic"));
        assert_eq!(report.jobs[2].status, "synced");
        assert!(!scheduler.is_sync_in_progress());
    }

    #[tokio::test]
    async fn test_concurrent_pass_is_rejected() {
        let slow = TestJob::new("slow", Behavior::Succeed, Duration::from_millis(300));
        let scheduler = scheduler_with(vec![slow.clone()]);

        let background = scheduler.clone();
        let first = tokio::spawn(async move { background.run_sync().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_sync_in_progress());

        let second = scheduler.manual_sync().await;
        assert!(matches!(second, Err(JobError::AlreadyRunning)));
        assert_eq!(slow.started(), 1);

        first.await.unwrap().unwrap();
        assert_eq!(slow.finished(), 1);

        // The guard is released, so the next pass goes through.
        scheduler.run_sync().await.unwrap();
        assert_eq!(slow.started(), 2);
    }

    #[tokio::test]
    async fn test_rejected_pass_makes_no_upstream_calls() {
        let source = Arc::new(FakeItemSource::with_items(
            ItemCategory::Found,
            vec![found("F1", "지갑")],
        ));
        source.set_delay(Duration::from_millis(300));
        let store = Arc::new(SqliteItemStore::in_memory().unwrap());
        let synchronizer = Arc::new(ItemSynchronizer::new(
            source.clone(),
            store.clone(),
            DEFAULT_BATCH_SIZE,
        ));
        let job = Arc::new(ItemSyncJob::new(
            ItemCategory::Found,
            synchronizer,
            store,
            DEFAULT_STALE_AFTER,
        ));
        let scheduler =
            SyncScheduler::new(vec![job as Arc<dyn BackgroundJob>], DEFAULT_SYNC_INTERVAL);

        let background = scheduler.clone();
        let first = tokio::spawn(async move { background.run_sync().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(scheduler.run_sync().await.is_err());
        assert_eq!(source.page_calls(), 1);

        let report = first.await.unwrap().unwrap();
        assert_eq!(report.jobs[0].items_count, Some(1));
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let scheduler = scheduler_with(vec![]);
        assert_eq!(scheduler.sync_interval(), DEFAULT_SYNC_INTERVAL);

        assert_eq!(
            scheduler.set_sync_interval(Duration::from_secs(1)),
            MIN_SYNC_INTERVAL
        );
        assert_eq!(scheduler.sync_interval(), MIN_SYNC_INTERVAL);

        let three_hours = Duration::from_secs(3 * 3600);
        assert_eq!(scheduler.set_sync_interval(three_hours), three_hours);

        let clamped = SyncScheduler::new(vec![], Duration::from_secs(5));
        assert_eq!(clamped.sync_interval(), MIN_SYNC_INTERVAL);
    }

    #[tokio::test]
    async fn test_huge_interval_is_capped_and_timer_survives() {
        let job = TestJob::new("job", Behavior::Succeed, Duration::ZERO);
        let scheduler = scheduler_with(vec![job.clone()]);
        assert!(scheduler.start());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let effective = scheduler.set_sync_interval(Duration::from_secs(u64::MAX));
        assert_eq!(effective, MAX_SYNC_INTERVAL);
        assert_eq!(scheduler.sync_interval(), MAX_SYNC_INTERVAL);

        // A re-armed timer still accepts a later change and keeps running.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_started());
        assert_eq!(
            scheduler.set_sync_interval(Duration::from_secs(600)),
            Duration::from_secs(600)
        );
        assert_eq!(job.started(), 1);
        scheduler.stop();

        let capped = SyncScheduler::new(vec![], Duration::from_secs(u64::MAX));
        assert_eq!(capped.sync_interval(), MAX_SYNC_INTERVAL);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_runs_immediately() {
        let job = TestJob::new("job", Behavior::Succeed, Duration::ZERO);
        let scheduler = scheduler_with(vec![job.clone()]);

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_started());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(job.finished(), 1);

        scheduler.stop();
        assert!(!scheduler.is_started());
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_pass_finish() {
        let slow = TestJob::new("slow", Behavior::Succeed, Duration::from_millis(200));
        let scheduler = scheduler_with(vec![slow.clone()]);

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(slow.started(), 1);

        scheduler.stop();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(slow.finished(), 1);
        assert!(!scheduler.is_sync_in_progress());
    }

    #[tokio::test]
    async fn test_set_interval_while_started_keeps_running() {
        let job = TestJob::new("job", Behavior::Succeed, Duration::ZERO);
        let scheduler = scheduler_with(vec![job.clone()]);
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        scheduler.set_sync_interval(Duration::from_secs(600));

        assert!(scheduler.is_started());
        assert_eq!(scheduler.sync_interval(), Duration::from_secs(600));
        // Re-arming waits a full interval before the next pass.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(job.started(), 1);
        scheduler.stop();
    }
}
