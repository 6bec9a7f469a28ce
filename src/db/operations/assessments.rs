use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::operations::{new_id, parse_json_column, to_json_column};
use crate::models::{AssessmentStatus, PreAssessment, PreAssessmentResponse};

const ASSESSMENT_COLUMNS: &str =
    r#""id","studyPlanId","status","totalQuestions","correctScore","questionsData","createdAt","completedAt""#;

pub async fn get_by_plan(
    conn: &mut SqliteConnection,
    plan_id: &str,
) -> Result<Option<PreAssessment>, sqlx::Error> {
    let sql = format!(r#"SELECT {ASSESSMENT_COLUMNS} FROM "pre_assessments" WHERE "studyPlanId" = ?"#);
    let row = sqlx::query(&sql).bind(plan_id).fetch_optional(&mut *conn).await?;
    row.as_ref().map(map_assessment_row).transpose()
}

pub async fn get_by_id(
    conn: &mut SqliteConnection,
    assessment_id: &str,
) -> Result<Option<PreAssessment>, sqlx::Error> {
    let sql = format!(r#"SELECT {ASSESSMENT_COLUMNS} FROM "pre_assessments" WHERE "id" = ?"#);
    let row = sqlx::query(&sql).bind(assessment_id).fetch_optional(&mut *conn).await?;
    row.as_ref().map(map_assessment_row).transpose()
}

/// Inserts unless the plan already has an assessment. Returns whether a row was written.
pub async fn insert_if_absent(
    conn: &mut SqliteConnection,
    assessment: &PreAssessment,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"INSERT INTO "pre_assessments" ("id","studyPlanId","status","totalQuestions","correctScore","questionsData","createdAt")
           VALUES (?,?,?,?,?,?,?)
           ON CONFLICT ("studyPlanId") DO NOTHING"#,
    )
    .bind(&assessment.id)
    .bind(&assessment.study_plan_id)
    .bind(assessment.status.as_str())
    .bind(assessment.total_questions)
    .bind(assessment.correct_score)
    .bind(to_json_column(&assessment.questions_data)?)
    .bind(assessment.created_at)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

pub async fn insert_response(
    conn: &mut SqliteConnection,
    assessment_id: &str,
    flashcard_id: &str,
    is_correct: bool,
    response_time_ms: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO "pre_assessment_responses" ("id","preAssessmentId","flashcardId","isCorrect","responseTimeMs","createdAt")
           VALUES (?,?,?,?,?,?)"#,
    )
    .bind(new_id())
    .bind(assessment_id)
    .bind(flashcard_id)
    .bind(is_correct)
    .bind(response_time_ms)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn list_responses(
    conn: &mut SqliteConnection,
    assessment_id: &str,
) -> Result<Vec<PreAssessmentResponse>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id","preAssessmentId","flashcardId","isCorrect","responseTimeMs","createdAt"
           FROM "pre_assessment_responses" WHERE "preAssessmentId" = ? ORDER BY "createdAt", rowid"#,
    )
    .bind(assessment_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(PreAssessmentResponse {
                id: row.try_get("id")?,
                pre_assessment_id: row.try_get("preAssessmentId")?,
                flashcard_id: row.try_get("flashcardId")?,
                is_correct: row.try_get("isCorrect").unwrap_or(false),
                response_time_ms: row.try_get("responseTimeMs").ok().flatten(),
                created_at: row.try_get("createdAt").unwrap_or_else(|_| Utc::now()),
            })
        })
        .collect()
}

/// Completes a pending assessment. Zero rows affected means it was already completed.
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    assessment_id: &str,
    correct_score: f64,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"UPDATE "pre_assessments" SET "status" = ?, "correctScore" = ?, "completedAt" = ?
           WHERE "id" = ? AND "status" = ?"#,
    )
    .bind(AssessmentStatus::Completed.as_str())
    .bind(correct_score)
    .bind(now)
    .bind(assessment_id)
    .bind(AssessmentStatus::Pending.as_str())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

fn map_assessment_row(row: &SqliteRow) -> Result<PreAssessment, sqlx::Error> {
    let status: String = row.try_get("status").unwrap_or_default();

    Ok(PreAssessment {
        id: row.try_get("id")?,
        study_plan_id: row.try_get("studyPlanId")?,
        status: AssessmentStatus::from_str(&status),
        total_questions: row.try_get("totalQuestions").unwrap_or(0),
        correct_score: row.try_get("correctScore").unwrap_or(0.0),
        questions_data: parse_json_column(
            row.try_get("questionsData").ok(),
            "pre_assessments.questionsData",
        ),
        created_at: row.try_get("createdAt").unwrap_or_else(|_| Utc::now()),
        completed_at: row.try_get("completedAt").ok().flatten(),
    })
}
