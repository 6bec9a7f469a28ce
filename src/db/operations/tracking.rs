use chrono::Utc;
use sqlx::{Row, SqliteConnection};

use crate::models::TrackingEvent;

pub async fn insert_event(conn: &mut SqliteConnection, event: &TrackingEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO "tracking_events" ("id","userId","studyPlanId","mode","flashcardId","isCorrect","responseTimeMs","attemptsNeeded","createdAt")
           VALUES (?,?,?,?,?,?,?,?,?)"#,
    )
    .bind(&event.id)
    .bind(&event.user_id)
    .bind(&event.study_plan_id)
    .bind(&event.mode)
    .bind(event.flashcard_id.as_deref())
    .bind(event.is_correct)
    .bind(event.response_time_ms)
    .bind(event.attempts_needed)
    .bind(event.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Most recent events of a user, newest first; insertion order breaks timestamp ties.
pub async fn recent_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    limit: i64,
) -> Result<Vec<TrackingEvent>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id","userId","studyPlanId","mode","flashcardId","isCorrect","responseTimeMs","attemptsNeeded","createdAt"
           FROM "tracking_events" WHERE "userId" = ?
           ORDER BY "createdAt" DESC, rowid DESC LIMIT ?"#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(TrackingEvent {
                id: row.try_get("id")?,
                user_id: row.try_get("userId")?,
                study_plan_id: row.try_get("studyPlanId")?,
                mode: row.try_get("mode").unwrap_or_default(),
                flashcard_id: row.try_get("flashcardId").ok().flatten(),
                is_correct: row.try_get("isCorrect").ok().flatten(),
                response_time_ms: row.try_get("responseTimeMs").ok().flatten(),
                attempts_needed: row.try_get("attemptsNeeded").unwrap_or(1),
                created_at: row.try_get("createdAt").unwrap_or_else(|_| Utc::now()),
            })
        })
        .collect()
}
