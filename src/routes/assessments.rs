use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::PreAssessment;
use crate::response::{ok, AppError};
use crate::services::pre_assessment::{self, AssessmentAnswer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub responses: Vec<AssessmentAnswer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    assessment: PreAssessment,
    schedule_dispatched: bool,
}

pub async fn generate(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let assessment =
        pre_assessment::generate_pre_assessment(&mut *tx, &plan_id, &state.engine().assessment).await?;
    tx.commit().await?;
    Ok(ok(assessment).into_response())
}

pub async fn get_for_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Response, AppError> {
    let mut conn = state.db().pool().acquire().await?;
    let assessment = pre_assessment::get_for_plan(&mut *conn, &plan_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no pre-assessment for plan {plan_id}")))?;
    Ok(ok(assessment).into_response())
}

/// Grades the assessment, then regenerates the plan's schedule in the background.
pub async fn submit(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
    Json(body): Json<SubmitRequest>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let assessment = pre_assessment::submit_pre_assessment(
        &mut *tx,
        &assessment_id,
        &body.responses,
        &state.engine().assessment,
    )
    .await?;
    tx.commit().await?;

    let schedule_dispatched = state
        .dispatcher()
        .dispatch(&assessment.study_plan_id)
        .await?
        .is_some();

    Ok(ok(SubmitResponse {
        assessment,
        schedule_dispatched,
    })
    .into_response())
}
