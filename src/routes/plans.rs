use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::db::operations::plans;
use crate::models::PlanStatus;
use crate::response::{ok, AppError};
use crate::services::schedule;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanStatusResponse {
    plan_id: String,
    status: PlanStatus,
    needs_retry: bool,
}

/// Synchronous regeneration; the plan is active again once this returns.
pub async fn regenerate_schedule(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let outcome = schedule::generate_adaptive_schedule(&mut *tx, &plan_id, &state.engine().schedule).await?;
    plans::set_plan_status(&mut *tx, &plan_id, PlanStatus::Active).await?;
    tx.commit().await?;
    Ok(ok(outcome).into_response())
}

pub async fn status(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Response, AppError> {
    let mut conn = state.db().pool().acquire().await?;
    let plan = plans::get_plan(&mut *conn, &plan_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("study plan not found: {plan_id}")))?;

    Ok(ok(PlanStatusResponse {
        plan_id: plan.id,
        status: plan.status,
        needs_retry: plan.status == PlanStatus::GenerationFailed,
    })
    .into_response())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Response, AppError> {
    let mut conn = state.db().pool().acquire().await?;
    let tasks = schedule::list_plan_tasks(&mut *conn, &plan_id).await?;
    Ok(ok(tasks).into_response())
}
