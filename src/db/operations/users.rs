use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::operations::{new_id, parse_json_column, to_json_column};
use crate::models::{LearningSpeed, StudyMode, SubjectKey, User};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub learning_speed: LearningSpeed,
    pub study_hours_per_week: i64,
}

#[derive(Debug, Clone)]
pub struct OnboardingUpdate {
    pub learning_speed: LearningSpeed,
    pub study_hours_per_week: i64,
    pub preferred_study_modes: Vec<StudyMode>,
    pub favorite_subjects: Vec<SubjectKey>,
    pub study_time_preference: Option<String>,
}

pub async fn get_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "id","email","learningSpeed","studyHoursPerWeek","preferredStudyModes","favoriteSubjects",
                  "studyTimePreference","onboardingCompleted","onboardingDate"
           FROM "users" WHERE "id" = ?"#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_user_row).transpose()
}

pub async fn insert_user(conn: &mut SqliteConnection, input: NewUser) -> Result<User, sqlx::Error> {
    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        r#"INSERT INTO "users" ("id","email","learningSpeed","studyHoursPerWeek","createdAt","updatedAt")
           VALUES (?,?,?,?,?,?)"#,
    )
    .bind(&id)
    .bind(&input.email)
    .bind(input.learning_speed.as_str())
    .bind(input.study_hours_per_week)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(User {
        id,
        email: input.email,
        learning_speed: input.learning_speed,
        study_hours_per_week: input.study_hours_per_week,
        preferred_study_modes: Vec::new(),
        favorite_subjects: Vec::new(),
        study_time_preference: None,
        onboarding_completed: false,
        onboarding_date: None,
    })
}

pub async fn apply_onboarding(
    conn: &mut SqliteConnection,
    user_id: &str,
    update: &OnboardingUpdate,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"UPDATE "users" SET "learningSpeed" = ?, "studyHoursPerWeek" = ?, "preferredStudyModes" = ?,
                  "favoriteSubjects" = ?, "studyTimePreference" = ?, "onboardingCompleted" = 1,
                  "onboardingDate" = ?, "updatedAt" = ?
           WHERE "id" = ?"#,
    )
    .bind(update.learning_speed.as_str())
    .bind(update.study_hours_per_week)
    .bind(to_json_column(&update.preferred_study_modes)?)
    .bind(to_json_column(&update.favorite_subjects)?)
    .bind(update.study_time_preference.as_deref())
    .bind(now)
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

fn map_user_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let learning_speed: String = row.try_get("learningSpeed").unwrap_or_default();

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email").unwrap_or_default(),
        learning_speed: LearningSpeed::from_str(&learning_speed),
        study_hours_per_week: row.try_get("studyHoursPerWeek").unwrap_or(10),
        preferred_study_modes: parse_json_column(
            row.try_get("preferredStudyModes").ok(),
            "users.preferredStudyModes",
        ),
        favorite_subjects: parse_json_column(
            row.try_get("favoriteSubjects").ok(),
            "users.favoriteSubjects",
        ),
        study_time_preference: row.try_get("studyTimePreference").ok().flatten(),
        onboarding_completed: row.try_get("onboardingCompleted").unwrap_or(false),
        onboarding_date: row.try_get("onboardingDate").ok().flatten(),
    })
}
