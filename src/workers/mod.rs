mod dispatcher;
mod maintenance;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::db::config::{env_bool, env_u32, env_u64};
use crate::db::DatabaseProxy;

pub use dispatcher::ScheduleDispatcher;
pub use maintenance::{run_maintenance, MaintenanceReport};

static WORKER_LEADER: AtomicBool = AtomicBool::new(false);

pub fn is_worker_leader() -> bool {
    WORKER_LEADER.load(Ordering::Relaxed)
}

fn set_worker_leader(val: bool) {
    WORKER_LEADER.store(val, Ordering::Relaxed);
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff * n`.
    pub backoff: Duration,
    pub stuck_plan_after: chrono::Duration,
    pub maintenance_schedule: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            stuck_plan_after: chrono::Duration::minutes(30),
            maintenance_schedule: "0 */5 * * * *".to_string(),
        }
    }
}

impl JobConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_u32("SCHEDULE_JOB_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            backoff: Duration::from_millis(env_u64(
                "SCHEDULE_JOB_BACKOFF_MS",
                defaults.backoff.as_millis() as u64,
            )),
            stuck_plan_after: chrono::Duration::minutes(env_u64(
                "STUCK_PLAN_MINUTES",
                defaults.stuck_plan_after.num_minutes() as u64,
            ) as i64),
            maintenance_schedule: std::env::var("MAINTENANCE_SCHEDULE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.maintenance_schedule),
        }
    }
}

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    db: DatabaseProxy,
    dispatcher: ScheduleDispatcher,
    config: JobConfig,
}

impl WorkerManager {
    pub async fn new(
        db: DatabaseProxy,
        dispatcher: ScheduleDispatcher,
        config: JobConfig,
    ) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            db,
            dispatcher,
            config,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        if !env_bool("WORKER_LEADER", false) {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        set_worker_leader(true);
        info!("starting workers (leader mode)");

        let scheduler = self.scheduler.lock().await;

        let schedule = self.config.maintenance_schedule.clone();
        let db = self.db.clone();
        let dispatcher = self.dispatcher.clone();
        let stuck_after = self.config.stuck_plan_after;
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
            let db = db.clone();
            let dispatcher = dispatcher.clone();
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {},
                    result = run_maintenance(&db, &dispatcher, stuck_after) => {
                        if let Err(e) = result {
                            error!(error = %e, "maintenance worker error");
                        }
                    }
                }
            })
        })?;
        scheduler.add(job).await?;
        info!(schedule = %schedule, "maintenance worker scheduled");

        scheduler.start().await?;
        info!("all workers started");
        Ok(())
    }

    pub async fn stop(&self) {
        if !is_worker_leader() {
            return;
        }

        info!("stopping workers");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "error shutting down scheduler");
        }

        set_worker_leader(false);
        info!("workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
