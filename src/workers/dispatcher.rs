use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::db::operations::plans;
use crate::db::DatabaseProxy;
use crate::models::PlanStatus;
use crate::services::schedule::{self, ScheduleError, ScheduleOutcome};
use crate::workers::JobConfig;

/// Fire-and-forget schedule regeneration.
///
/// The plan's stored status is the only completion signal: `generating`
/// while a job is in flight, then `active` or `generation_failed`.
#[derive(Clone)]
pub struct ScheduleDispatcher {
    db: DatabaseProxy,
    engine: Arc<EngineConfig>,
    jobs: JobConfig,
}

impl ScheduleDispatcher {
    pub fn new(db: DatabaseProxy, engine: Arc<EngineConfig>, jobs: JobConfig) -> Self {
        Self { db, engine, jobs }
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Marks the plan `generating` and regenerates its schedule in the background.
    ///
    /// Returns `None` for an unknown plan. Otherwise the handle resolves to
    /// the plan's final status; dropping it does not cancel the job.
    pub async fn dispatch(&self, plan_id: &str) -> Result<Option<JoinHandle<PlanStatus>>, sqlx::Error> {
        if !self.mark(plan_id, PlanStatus::Generating).await? {
            warn!(plan_id = %plan_id, "cannot dispatch schedule job for unknown plan");
            return Ok(None);
        }
        info!(plan_id = %plan_id, "schedule regeneration dispatched");

        let job = self.clone();
        let plan_id = plan_id.to_string();
        Ok(Some(tokio::spawn(async move { job.run(&plan_id).await })))
    }

    async fn run(&self, plan_id: &str) -> PlanStatus {
        let max_attempts = self.jobs.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.run_once(plan_id).await {
                Ok(outcome) => {
                    info!(
                        plan_id = %plan_id,
                        attempt,
                        tasks = outcome.tasks_created(),
                        "schedule job finished"
                    );
                    return PlanStatus::Active;
                }
                Err(ScheduleError::PlanNotFound(_)) => {
                    warn!(plan_id = %plan_id, "plan vanished before its schedule job ran");
                    return PlanStatus::GenerationFailed;
                }
                Err(err @ ScheduleError::UserNotFound(_)) => {
                    warn!(plan_id = %plan_id, error = %err, "schedule job cannot run");
                    break;
                }
                Err(err) => {
                    warn!(plan_id = %plan_id, attempt, max_attempts, error = %err, "schedule job attempt failed");
                    if attempt < max_attempts {
                        tokio::time::sleep(self.jobs.backoff * attempt).await;
                    }
                }
            }
        }

        if let Err(err) = self.mark(plan_id, PlanStatus::GenerationFailed).await {
            error!(plan_id = %plan_id, error = %err, "failed to flag plan as generation_failed");
        }
        PlanStatus::GenerationFailed
    }

    /// Regenerates and activates the plan in one transaction.
    async fn run_once(&self, plan_id: &str) -> Result<ScheduleOutcome, ScheduleError> {
        let mut tx = self.db.begin().await?;
        let outcome = schedule::generate_adaptive_schedule(&mut *tx, plan_id, &self.engine.schedule).await?;
        plans::set_plan_status(&mut *tx, plan_id, PlanStatus::Active).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn mark(&self, plan_id: &str, status: PlanStatus) -> Result<bool, sqlx::Error> {
        let mut conn = self.db.pool().acquire().await?;
        plans::set_plan_status(&mut *conn, plan_id, status).await
    }
}
