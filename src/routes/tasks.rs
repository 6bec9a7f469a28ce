use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::schedule;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    /// Overrides "today" (UTC) as `YYYY-MM-DD`, e.g. for clients in far-off time zones.
    pub date: Option<String>,
}

pub async fn complete(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let mut tx = state.db().begin().await?;
    let task = schedule::complete_task(&mut *tx, &task_id).await?;
    tx.commit().await?;
    Ok(ok(task).into_response())
}

pub async fn today(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TodayQuery>,
) -> Result<Response, AppError> {
    let day = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::bad_request(format!("invalid date: {raw}")))?,
        None => Utc::now().date_naive(),
    };
    let mut conn = state.db().pool().acquire().await?;
    let tasks = schedule::list_today_tasks(&mut *conn, &user_id, day).await?;
    Ok(ok(tasks).into_response())
}
