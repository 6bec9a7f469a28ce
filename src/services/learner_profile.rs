use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::db::operations::users::OnboardingUpdate;
use crate::db::operations::{new_id, profiles, users};
use crate::models::{LearnerProfile, LearningSpeed, StudyMode, SubjectKey, User};

/// Strength a favourite subject starts at (or is raised to) during onboarding.
pub const FAVORITE_SUBJECT_STRENGTH: f64 = 0.7;
const MAX_WEEKLY_HOURS: i64 = 168;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingInput {
    #[serde(default)]
    pub learning_speed: LearningSpeed,
    pub study_hours_per_week: i64,
    #[serde(default)]
    pub preferred_study_modes: Vec<StudyMode>,
    #[serde(default)]
    pub favorite_subjects: Vec<String>,
    #[serde(default)]
    pub study_time_preference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResult {
    pub user: User,
    pub profile: LearnerProfile,
}

fn empty_profile(user_id: &str, speed: Option<LearningSpeed>) -> LearnerProfile {
    let now = Utc::now();
    LearnerProfile {
        id: new_id(),
        user_id: user_id.to_string(),
        self_reported_speed: speed,
        subject_strengths: BTreeMap::new(),
        subject_learning_speeds: BTreeMap::new(),
        learning_efficiency_factor: 1.0,
        mode_performance: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    }
}

pub async fn get_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<LearnerProfile>, ProfileError> {
    Ok(profiles::get_by_user(&mut *conn, user_id).await?)
}

/// Returns the user's profile, creating a neutral one on first need.
pub async fn get_or_create(conn: &mut SqliteConnection, user_id: &str) -> Result<LearnerProfile, ProfileError> {
    if let Some(profile) = profiles::get_by_user(&mut *conn, user_id).await? {
        return Ok(profile);
    }
    if users::get_user(&mut *conn, user_id).await?.is_none() {
        return Err(ProfileError::UserNotFound(user_id.to_string()));
    }

    let profile = empty_profile(user_id, None);
    if profiles::insert_if_absent(&mut *conn, &profile).await? {
        tracing::info!(user_id = %user_id, "learner profile created");
        return Ok(profile);
    }
    profiles::get_by_user(&mut *conn, user_id)
        .await?
        .ok_or(ProfileError::Sql(sqlx::Error::RowNotFound))
}

fn validate_onboarding(input: &OnboardingInput) -> Result<Vec<SubjectKey>, ProfileError> {
    if !(0..=MAX_WEEKLY_HOURS).contains(&input.study_hours_per_week) {
        return Err(ProfileError::Validation(format!(
            "studyHoursPerWeek must be between 0 and {MAX_WEEKLY_HOURS}"
        )));
    }

    let mut subjects: Vec<SubjectKey> = Vec::with_capacity(input.favorite_subjects.len());
    for raw in &input.favorite_subjects {
        let key = SubjectKey::parse(raw).map_err(|e| ProfileError::Validation(e.to_string()))?;
        if !subjects.contains(&key) {
            subjects.push(key);
        }
    }
    Ok(subjects)
}

/// Stores the onboarding answers and seeds the learner profile from them.
///
/// A fresh profile starts every favourite at [`FAVORITE_SUBJECT_STRENGTH`].
/// An existing one keeps its history; favourites are only raised to that
/// floor and every other subject is left as it was.
pub async fn complete_onboarding(
    conn: &mut SqliteConnection,
    user_id: &str,
    input: OnboardingInput,
) -> Result<OnboardingResult, ProfileError> {
    let favorites = validate_onboarding(&input)?;

    let update = OnboardingUpdate {
        learning_speed: input.learning_speed,
        study_hours_per_week: input.study_hours_per_week,
        preferred_study_modes: input.preferred_study_modes,
        favorite_subjects: favorites.clone(),
        study_time_preference: input.study_time_preference,
    };
    if !users::apply_onboarding(&mut *conn, user_id, &update, Utc::now()).await? {
        return Err(ProfileError::UserNotFound(user_id.to_string()));
    }

    let profile = match profiles::get_by_user(&mut *conn, user_id).await? {
        Some(mut profile) => {
            profile.self_reported_speed = Some(input.learning_speed);
            for subject in &favorites {
                let entry = profile.subject_strengths.entry(subject.clone()).or_insert(0.0);
                *entry = entry.max(FAVORITE_SUBJECT_STRENGTH);
            }
            profiles::update(&mut *conn, &profile).await?;
            profile
        }
        None => {
            let mut profile = empty_profile(user_id, Some(input.learning_speed));
            profile.subject_strengths = favorites
                .iter()
                .map(|subject| (subject.clone(), FAVORITE_SUBJECT_STRENGTH))
                .collect();
            profiles::insert_if_absent(&mut *conn, &profile).await?;
            profile
        }
    };

    let user = users::get_user(&mut *conn, user_id)
        .await?
        .ok_or_else(|| ProfileError::UserNotFound(user_id.to_string()))?;

    tracing::info!(
        user_id = %user_id,
        speed = input.learning_speed.as_str(),
        favorites = favorites.len(),
        "onboarding completed"
    );
    Ok(OnboardingResult { user, profile })
}
