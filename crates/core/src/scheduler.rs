//! Interval scheduler for the queue processor, stop-loss monitor and
//! stuck-state cleanup.
//!
//! Each job runs in its own loop: sleep the interval, run one invocation
//! to completion, repeat. A slow invocation delays only its own loop.
//!
//! Stopping lets in-flight invocations finish for up to the shutdown grace
//! period, then aborts them. An aborted campaign run stays in its stage
//! and is resumed by a later queue invocation once it goes stale.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cleanup::StuckStateCleanup;
use crate::queue::QueueProcessor;
use crate::stoploss::StopLossMonitor;

const QUEUE_JOB: &str = "queue";
const STOP_LOSS_JOB: &str = "stop_loss";
const CLEANUP_JOB: &str = "cleanup";

/// Configuration for the launch scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run any loops at all. When disabled, everything is triggered via API.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub queue_enabled: bool,

    /// Seconds between queue processor invocations.
    #[serde(default = "default_queue_interval")]
    pub queue_interval_secs: u64,

    #[serde(default = "default_true")]
    pub stop_loss_enabled: bool,

    /// Seconds between stop-loss scans.
    #[serde(default = "default_stop_loss_interval")]
    pub stop_loss_interval_secs: u64,

    #[serde(default = "default_true")]
    pub cleanup_enabled: bool,

    /// Seconds between stuck-state cleanup passes.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Seconds `stop` waits for in-flight invocations before aborting them.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_queue_interval() -> u64 {
    60
}

fn default_stop_loss_interval() -> u64 {
    900 // 15 minutes
}

fn default_cleanup_interval() -> u64 {
    600 // 10 minutes
}

fn default_shutdown_grace() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_enabled: true,
            queue_interval_secs: default_queue_interval(),
            stop_loss_enabled: true,
            stop_loss_interval_secs: default_stop_loss_interval(),
            cleanup_enabled: true,
            cleanup_interval_secs: default_cleanup_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// Last run of one job loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStatus {
    pub enabled: bool,
    pub interval_secs: u64,
    pub runs: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Short summary of the last run, or its error.
    pub last_result: Option<String>,
}

/// Current status of the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub queue: JobStatus,
    pub stop_loss: JobStatus,
    pub cleanup: JobStatus,
}

type JobTable = Arc<RwLock<HashMap<&'static str, JobStatus>>>;

/// Owns the three job loops.
pub struct LaunchScheduler {
    config: SchedulerConfig,
    queue: Arc<QueueProcessor>,
    stop_loss: Arc<StopLossMonitor>,
    cleanup: Arc<StuckStateCleanup>,

    // Runtime state
    running: Arc<AtomicBool>,
    jobs: JobTable,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl LaunchScheduler {
    pub fn new(
        config: SchedulerConfig,
        queue: Arc<QueueProcessor>,
        stop_loss: Arc<StopLossMonitor>,
        cleanup: Arc<StuckStateCleanup>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let mut jobs = HashMap::new();
        jobs.insert(
            QUEUE_JOB,
            JobStatus {
                enabled: config.queue_enabled,
                interval_secs: config.queue_interval_secs,
                ..Default::default()
            },
        );
        jobs.insert(
            STOP_LOSS_JOB,
            JobStatus {
                enabled: config.stop_loss_enabled,
                interval_secs: config.stop_loss_interval_secs,
                ..Default::default()
            },
        );
        jobs.insert(
            CLEANUP_JOB,
            JobStatus {
                enabled: config.cleanup_enabled,
                interval_secs: config.cleanup_interval_secs,
                ..Default::default()
            },
        );

        Self {
            config,
            queue,
            stop_loss,
            cleanup,
            running: Arc::new(AtomicBool::new(false)),
            jobs: Arc::new(RwLock::new(jobs)),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start the scheduler (spawns background tasks).
    pub async fn start(&self) {
        if !self.config.enabled {
            info!("Launch scheduler disabled");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Launch scheduler already running");
            return;
        }

        info!("Starting launch scheduler");

        if self.config.queue_enabled {
            let queue = Arc::clone(&self.queue);
            self.spawn_loop(QUEUE_JOB, self.config.queue_interval_secs, move || {
                let queue = Arc::clone(&queue);
                async move {
                    match queue.process().await {
                        Ok(outcome) => outcome.label().to_string(),
                        Err(e) => format!("error: {}", e),
                    }
                }
            });
        }

        if self.config.stop_loss_enabled {
            let monitor = Arc::clone(&self.stop_loss);
            self.spawn_loop(STOP_LOSS_JOB, self.config.stop_loss_interval_secs, move || {
                let monitor = Arc::clone(&monitor);
                async move {
                    match monitor.check().await {
                        Ok(report) => format!(
                            "checked {}, {} new violations, {} errors",
                            report.campaigns_checked,
                            report.violations_found,
                            report.errors.len()
                        ),
                        Err(e) => format!("error: {}", e),
                    }
                }
            });
        }

        if self.config.cleanup_enabled {
            let cleanup = Arc::clone(&self.cleanup);
            self.spawn_loop(CLEANUP_JOB, self.config.cleanup_interval_secs, move || {
                let cleanup = Arc::clone(&cleanup);
                async move {
                    match cleanup.run().await {
                        Ok(report) => format!(
                            "scanned {}, failed {}",
                            report.campaigns_scanned, report.marked_failed
                        ),
                        Err(e) => format!("error: {}", e),
                    }
                }
            });
        }

        info!("Launch scheduler started");
    }

    /// Stop the scheduler and wait for its loops to exit.
    ///
    /// Loops idle between runs exit at once. A loop mid-invocation gets
    /// `shutdown_grace_secs` to finish before it is aborted.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Launch scheduler not running");
            return;
        }

        info!("Stopping launch scheduler");

        // Signal shutdown to all loops
        let _ = self.shutdown_tx.send(());

        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        let deadline = tokio::time::Instant::now() + grace;
        let mut aborted = 0;
        for mut handle in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Scheduler loop ended abnormally"),
                Err(_) => {
                    handle.abort();
                    aborted += 1;
                }
            }
        }
        if aborted > 0 {
            warn!(
                aborted,
                grace_secs = self.config.shutdown_grace_secs,
                "Aborted scheduler loops still running after the grace period"
            );
        }

        info!("Launch scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let jobs = self.jobs.read().await;
        let job = |name| jobs.get(name).cloned().unwrap_or_default();
        SchedulerStatus {
            running: self.is_running(),
            queue: job(QUEUE_JOB),
            stop_loss: job(STOP_LOSS_JOB),
            cleanup: job(CLEANUP_JOB),
        }
    }

    fn spawn_loop<F, Fut>(&self, name: &'static str, interval_secs: u64, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let running = Arc::clone(&self.running);
        let jobs = Arc::clone(&self.jobs);
        let interval = Duration::from_secs(interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(job = name, interval_secs, "Scheduler loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(job = name, "Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let result = job().await;
                        if let Some(status) = jobs.write().await.get_mut(name) {
                            status.runs += 1;
                            status.last_run_at = Some(Utc::now());
                            status.last_result = Some(result);
                        }
                    }
                }
            }
            info!(job = name, "Scheduler loop stopped");
        });
        self.handles.lock().unwrap().push(handle);
    }
}
