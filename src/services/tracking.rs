use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::db::operations::{flashcards, new_id, plans, tracking};
use crate::models::{LearnerProfile, StudyMode, TrackingEvent};
use crate::services::analytics::{self, AnalyticsConfig};
use crate::services::learner_profile::ProfileError;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("study plan not found: {0}")]
    PlanNotFound(String),
    #[error("flashcard not found: {0}")]
    FlashcardNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

impl From<ProfileError> for TrackingError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::UserNotFound(id) => Self::UserNotFound(id),
            ProfileError::Validation(msg) => Self::Validation(msg),
            ProfileError::Sql(e) => Self::Sql(e),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInput {
    pub study_plan_id: String,
    pub mode: StudyMode,
    #[serde(default)]
    pub flashcard_id: Option<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
    #[serde(default = "default_attempts")]
    pub attempts_needed: i64,
}

fn default_attempts() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReceipt {
    pub event: TrackingEvent,
    pub profile: LearnerProfile,
}

/// Appends a study event and folds it into the learner profile.
pub async fn record_event(
    conn: &mut SqliteConnection,
    user_id: &str,
    input: TrackingInput,
    config: &AnalyticsConfig,
) -> Result<TrackingReceipt, TrackingError> {
    if input.attempts_needed < 1 {
        return Err(TrackingError::Validation("attemptsNeeded must be at least 1".to_string()));
    }
    if input.response_time_ms.is_some_and(|ms| ms < 0) {
        return Err(TrackingError::Validation("responseTimeMs must not be negative".to_string()));
    }

    let plan = plans::get_plan(&mut *conn, &input.study_plan_id)
        .await?
        .filter(|plan| plan.user_id == user_id)
        .ok_or_else(|| TrackingError::PlanNotFound(input.study_plan_id.clone()))?;

    if let Some(flashcard_id) = input.flashcard_id.as_deref() {
        let belongs = flashcards::get_flashcard(&mut *conn, flashcard_id)
            .await?
            .is_some_and(|card| card.study_plan_id == plan.id);
        if !belongs {
            return Err(TrackingError::FlashcardNotFound(flashcard_id.to_string()));
        }
    }

    let now = Utc::now();
    let event = TrackingEvent {
        id: new_id(),
        user_id: user_id.to_string(),
        study_plan_id: plan.id.clone(),
        mode: input.mode.as_str().to_string(),
        flashcard_id: input.flashcard_id,
        is_correct: input.is_correct,
        response_time_ms: input.response_time_ms,
        attempts_needed: input.attempts_needed,
        created_at: now,
    };
    tracking::insert_event(&mut *conn, &event).await?;

    if let Some(flashcard_id) = event.flashcard_id.as_deref() {
        flashcards::record_study(&mut *conn, flashcard_id, now).await?;
    }

    tracing::debug!(
        user_id = %user_id,
        plan_id = %plan.id,
        mode = %event.mode,
        correct = ?event.is_correct,
        "tracking event recorded"
    );

    let profile = analytics::update_after_session(&mut *conn, user_id, config).await?;
    Ok(TrackingReceipt { event, profile })
}
