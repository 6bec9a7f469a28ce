use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::response::{ok, AppError};
use crate::services::learner_profile::{self, OnboardingInput};
use crate::services::tracking::{self, TrackingInput};
use crate::state::AppState;

pub async fn onboarding(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<OnboardingInput>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let result = learner_profile::complete_onboarding(&mut *tx, &user_id, input).await?;
    tx.commit().await?;
    Ok(ok(result).into_response())
}

pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let profile = learner_profile::get_or_create(&mut *tx, &user_id).await?;
    tx.commit().await?;
    Ok(ok(profile).into_response())
}

pub async fn track(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<TrackingInput>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let receipt = tracking::record_event(&mut *tx, &user_id, input, &state.engine().analytics).await?;
    tx.commit().await?;
    Ok(ok(receipt).into_response())
}
