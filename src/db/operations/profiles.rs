use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::operations::{parse_json_column, to_json_column};
use crate::models::{LearnerProfile, LearningSpeed, SubjectKey};

pub async fn get_by_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<LearnerProfile>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "id","userId","selfReportedSpeed","subjectStrengths","subjectLearningSpeeds",
                  "learningEfficiencyFactor","modePerformance","createdAt","updatedAt"
           FROM "learner_profiles" WHERE "userId" = ?"#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_profile_row).transpose()
}

/// Inserts the profile unless the user already has one. Returns whether a row was written.
pub async fn insert_if_absent(conn: &mut SqliteConnection, profile: &LearnerProfile) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"INSERT INTO "learner_profiles" ("id","userId","selfReportedSpeed","subjectStrengths","subjectLearningSpeeds",
                                           "learningEfficiencyFactor","modePerformance","createdAt","updatedAt")
           VALUES (?,?,?,?,?,?,?,?,?)
           ON CONFLICT ("userId") DO NOTHING"#,
    )
    .bind(&profile.id)
    .bind(&profile.user_id)
    .bind(profile.self_reported_speed.map(|s| s.as_str()))
    .bind(to_json_column(&clamped_strengths(&profile.subject_strengths))?)
    .bind(to_json_column(&profile.subject_learning_speeds)?)
    .bind(profile.learning_efficiency_factor)
    .bind(to_json_column(&profile.mode_performance)?)
    .bind(profile.created_at)
    .bind(profile.updated_at)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

pub async fn update(conn: &mut SqliteConnection, profile: &LearnerProfile) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE "learner_profiles"
           SET "selfReportedSpeed" = ?, "subjectStrengths" = ?, "subjectLearningSpeeds" = ?,
               "learningEfficiencyFactor" = ?, "modePerformance" = ?, "updatedAt" = ?
           WHERE "userId" = ?"#,
    )
    .bind(profile.self_reported_speed.map(|s| s.as_str()))
    .bind(to_json_column(&clamped_strengths(&profile.subject_strengths))?)
    .bind(to_json_column(&profile.subject_learning_speeds)?)
    .bind(profile.learning_efficiency_factor)
    .bind(to_json_column(&profile.mode_performance)?)
    .bind(Utc::now())
    .bind(&profile.user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Strengths are fractions; anything outside [0, 1] is clamped before it hits the store.
fn clamped_strengths(strengths: &BTreeMap<SubjectKey, f64>) -> BTreeMap<SubjectKey, f64> {
    strengths
        .iter()
        .map(|(subject, value)| {
            let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.5 };
            (subject.clone(), value)
        })
        .collect()
}

fn map_profile_row(row: &SqliteRow) -> Result<LearnerProfile, sqlx::Error> {
    let speed: Option<String> = row.try_get("selfReportedSpeed").ok().flatten();
    let now = Utc::now();

    Ok(LearnerProfile {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        self_reported_speed: speed.as_deref().map(LearningSpeed::from_str),
        subject_strengths: parse_json_column(
            row.try_get("subjectStrengths").ok(),
            "learner_profiles.subjectStrengths",
        ),
        subject_learning_speeds: parse_json_column(
            row.try_get("subjectLearningSpeeds").ok(),
            "learner_profiles.subjectLearningSpeeds",
        ),
        learning_efficiency_factor: row.try_get("learningEfficiencyFactor").unwrap_or(1.0),
        mode_performance: parse_json_column(
            row.try_get("modePerformance").ok(),
            "learner_profiles.modePerformance",
        ),
        created_at: row.try_get("createdAt").unwrap_or(now),
        updated_at: row.try_get("updatedAt").unwrap_or(now),
    })
}
