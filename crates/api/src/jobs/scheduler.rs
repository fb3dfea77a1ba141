//! Job scheduler infrastructure for background tasks.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    Seconds(u64),
    Minutes(u64),
}

impl JobFrequency {
    /// Get the duration between job executions.
    pub fn duration(&self) -> Duration {
        match self {
            JobFrequency::Seconds(secs) => Duration::from_secs(*secs),
            JobFrequency::Minutes(mins) => Duration::from_secs(*mins * 60),
        }
    }
}

/// Trait for implementing background jobs.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// The name of this job (used for logging and metric labels).
    fn name(&self) -> &'static str;

    fn frequency(&self) -> JobFrequency;

    /// Execute the job once. Errors are logged and the job keeps its
    /// schedule.
    async fn execute(&self) -> Result<(), String>;
}

/// Runs one execution and records its outcome.
async fn run_once(job: &dyn Job) {
    let name = job.name();
    let start = Instant::now();

    let result = job.execute().await;
    let elapsed = start.elapsed();
    histogram!("background_job_duration_seconds", "job" => name).record(elapsed.as_secs_f64());

    match result {
        Ok(()) => {
            counter!("background_job_runs_total", "job" => name, "result" => "success")
                .increment(1);
            info!(job = name, elapsed_ms = elapsed.as_millis() as u64, "Job completed");
        }
        Err(e) => {
            counter!("background_job_runs_total", "job" => name, "result" => "failure")
                .increment(1);
            error!(
                job = name,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Job failed"
            );
        }
    }
}

/// Background job scheduler.
///
/// Each job runs on its own tokio task with an interval timer. Ticks missed
/// while a run is still in progress are skipped, so runs of one job never
/// overlap.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    /// Register a job with the scheduler.
    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Start all registered jobs. The first run happens one period after
    /// start.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");

        for job in &self.jobs {
            let job = Arc::clone(job);
            let mut shutdown_rx = self.shutdown_rx.clone();

            let handle = tokio::spawn(async move {
                let name = job.name();
                let frequency = job.frequency();
                let mut interval = tokio::time::interval(frequency.duration());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

                // Skip the first immediate tick
                interval.tick().await;

                info!(job = name, frequency = ?frequency, "Job scheduled");

                loop {
                    tokio::select! {
                        _ = interval.tick() => run_once(job.as_ref()).await,
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                info!(job = name, "Job shutting down");
                                break;
                            }
                        }
                    }
                }
            });

            self.handles.push(handle);
        }
    }

    /// Signal all jobs to stop. Returns immediately.
    pub fn shutdown(&self) {
        info!("Initiating job scheduler shutdown");
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for all job tasks to finish, up to `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let shutdown_future = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!("Job task panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, shutdown_future).await {
            Ok(()) => info!("All jobs completed gracefully"),
            Err(_) => warn!("Job shutdown timed out after {:?}", timeout),
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        run_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting_job"
        }

        fn frequency(&self) -> JobFrequency {
            JobFrequency::Seconds(1)
        }

        async fn execute(&self) -> Result<(), String> {
            self.run_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err("boom".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_job_frequency_duration() {
        assert_eq!(JobFrequency::Seconds(30).duration(), Duration::from_secs(30));
        assert_eq!(JobFrequency::Minutes(15).duration(), Duration::from_secs(900));
    }

    #[test]
    fn test_scheduler_register() {
        let mut scheduler = JobScheduler::default();
        assert_eq!(scheduler.job_count(), 0);
        scheduler.register(CountingJob {
            run_count: Arc::new(AtomicUsize::new(0)),
            should_fail: false,
        });
        assert_eq!(scheduler.job_count(), 1);
    }

    #[tokio::test]
    async fn test_run_once_survives_failure() {
        let run_count = Arc::new(AtomicUsize::new(0));
        let job = CountingJob {
            run_count: Arc::clone(&run_count),
            should_fail: true,
        };
        run_once(&job).await;
        run_once(&job).await;
        assert_eq!(run_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_scheduler_shutdown_before_first_run() {
        let mut scheduler = JobScheduler::new();
        let run_count = Arc::new(AtomicUsize::new(0));
        scheduler.register(CountingJob {
            run_count: Arc::clone(&run_count),
            should_fail: false,
        });
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;

        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        // first tick is skipped, so nothing ran
        assert_eq!(run_count.load(Ordering::SeqCst), 0);
    }
}
