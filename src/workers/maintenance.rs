use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::operations::plans;
use crate::db::DatabaseProxy;
use crate::services::pre_assessment;
use crate::workers::{ScheduleDispatcher, WorkerError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub assessments_created: usize,
    pub assessments_failed: usize,
    pub plans_redispatched: usize,
}

/// Backfills missing pre-assessments and re-dispatches plans stuck in `generating`.
pub async fn run_maintenance(
    db: &DatabaseProxy,
    dispatcher: &ScheduleDispatcher,
    stuck_after: chrono::Duration,
) -> Result<MaintenanceReport, WorkerError> {
    let start = Instant::now();
    debug!("starting maintenance cycle");

    let mut report = MaintenanceReport::default();
    let config = &dispatcher.engine().assessment;

    let missing = {
        let mut conn = db.pool().acquire().await?;
        plans::plans_missing_assessment(&mut *conn).await?
    };
    for plan_id in missing {
        let mut tx = db.begin().await?;
        match pre_assessment::generate_pre_assessment(&mut *tx, &plan_id, config).await {
            Ok(_) => {
                tx.commit().await?;
                report.assessments_created += 1;
            }
            Err(err) => {
                warn!(plan_id = %plan_id, error = %err, "failed to backfill pre-assessment");
                report.assessments_failed += 1;
            }
        }
    }

    let cutoff = Utc::now() - stuck_after;
    let stuck = {
        let mut conn = db.pool().acquire().await?;
        plans::stuck_generating_plans(&mut *conn, cutoff).await?
    };
    for plan_id in stuck {
        if dispatcher.dispatch(&plan_id).await?.is_some() {
            report.plans_redispatched += 1;
        }
    }

    info!(
        assessments_created = report.assessments_created,
        assessments_failed = report.assessments_failed,
        plans_redispatched = report.plans_redispatched,
        duration_secs = format!("{:.2}", start.elapsed().as_secs_f64()),
        "maintenance cycle completed"
    );
    Ok(report)
}
