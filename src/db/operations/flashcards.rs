use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::operations::{new_id, parse_json_column, to_json_column};
use crate::models::{Difficulty, Flashcard, McqQuestion};

#[derive(Debug, Clone)]
pub struct NewFlashcard {
    pub study_plan_id: String,
    pub front_text: String,
    pub back_text: String,
    pub difficulty: Difficulty,
    pub mastery_level: f64,
}

#[derive(Debug, Clone)]
pub struct NewMcq {
    pub flashcard_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer_index: i64,
    pub rationale: Option<String>,
}

const FLASHCARD_COLUMNS: &str =
    r#""id","studyPlanId","frontText","backText","difficulty","masteryLevel","timesStudied","lastStudied""#;

pub async fn list_for_plan(conn: &mut SqliteConnection, plan_id: &str) -> Result<Vec<Flashcard>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {FLASHCARD_COLUMNS} FROM "flashcards" WHERE "studyPlanId" = ? ORDER BY "createdAt", rowid"#
    );
    let rows = sqlx::query(&sql).bind(plan_id).fetch_all(&mut *conn).await?;
    rows.iter().map(map_flashcard_row).collect()
}

pub async fn get_flashcard(
    conn: &mut SqliteConnection,
    flashcard_id: &str,
) -> Result<Option<Flashcard>, sqlx::Error> {
    let sql = format!(r#"SELECT {FLASHCARD_COLUMNS} FROM "flashcards" WHERE "id" = ?"#);
    let row = sqlx::query(&sql).bind(flashcard_id).fetch_optional(&mut *conn).await?;
    row.as_ref().map(map_flashcard_row).transpose()
}

pub async fn insert_flashcard(
    conn: &mut SqliteConnection,
    input: NewFlashcard,
) -> Result<Flashcard, sqlx::Error> {
    let id = new_id();
    let now = Utc::now();

    sqlx::query(
        r#"INSERT INTO "flashcards" ("id","studyPlanId","frontText","backText","difficulty","masteryLevel","timesStudied","createdAt","updatedAt")
           VALUES (?,?,?,?,?,?,0,?,?)"#,
    )
    .bind(&id)
    .bind(&input.study_plan_id)
    .bind(&input.front_text)
    .bind(&input.back_text)
    .bind(input.difficulty.as_str())
    .bind(input.mastery_level)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Flashcard {
        id,
        study_plan_id: input.study_plan_id,
        front_text: input.front_text,
        back_text: input.back_text,
        difficulty: input.difficulty,
        mastery_level: input.mastery_level,
        times_studied: 0,
        last_studied: None,
    })
}

pub async fn insert_mcq(conn: &mut SqliteConnection, input: NewMcq) -> Result<McqQuestion, sqlx::Error> {
    let id = new_id();

    sqlx::query(
        r#"INSERT INTO "mcq_questions" ("id","flashcardId","questionText","options","correctAnswerIndex","rationale","createdAt")
           VALUES (?,?,?,?,?,?,?)"#,
    )
    .bind(&id)
    .bind(&input.flashcard_id)
    .bind(&input.question_text)
    .bind(to_json_column(&input.options)?)
    .bind(input.correct_answer_index)
    .bind(input.rationale.as_deref())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(McqQuestion {
        id,
        flashcard_id: input.flashcard_id,
        question_text: input.question_text,
        options: input.options,
        correct_answer_index: input.correct_answer_index,
        rationale: input.rationale,
    })
}

/// First MCQ (by creation order) of every flashcard in the plan that has one.
pub async fn first_mcq_per_flashcard(
    conn: &mut SqliteConnection,
    plan_id: &str,
) -> Result<HashMap<String, McqQuestion>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT m."id", m."flashcardId", m."questionText", m."options", m."correctAnswerIndex", m."rationale"
           FROM "mcq_questions" m
           JOIN "flashcards" f ON f."id" = m."flashcardId"
           WHERE f."studyPlanId" = ?
           ORDER BY m."createdAt", m.rowid"#,
    )
    .bind(plan_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut first: HashMap<String, McqQuestion> = HashMap::new();
    for row in &rows {
        let flashcard_id: String = row.try_get("flashcardId")?;
        if first.contains_key(&flashcard_id) {
            continue;
        }
        let mcq = McqQuestion {
            id: row.try_get("id")?,
            flashcard_id: flashcard_id.clone(),
            question_text: row.try_get("questionText").unwrap_or_default(),
            options: parse_json_column(row.try_get("options").ok(), "mcq_questions.options"),
            correct_answer_index: row.try_get("correctAnswerIndex").unwrap_or(0),
            rationale: row.try_get("rationale").ok().flatten(),
        };
        first.insert(flashcard_id, mcq);
    }
    Ok(first)
}

/// Overwrites the mastery fields from one graded pre-assessment answer.
pub async fn apply_assessment_grade(
    conn: &mut SqliteConnection,
    flashcard_id: &str,
    mastery_level: f64,
    difficulty: Option<Difficulty>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE "flashcards"
           SET "masteryLevel" = ?, "timesStudied" = 1, "lastStudied" = ?,
               "difficulty" = COALESCE(?, "difficulty"), "updatedAt" = ?
           WHERE "id" = ?"#,
    )
    .bind(mastery_level)
    .bind(now)
    .bind(difficulty.map(|d| d.as_str()))
    .bind(now)
    .bind(flashcard_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn record_study(
    conn: &mut SqliteConnection,
    flashcard_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"UPDATE "flashcards" SET "timesStudied" = "timesStudied" + 1, "lastStudied" = ?, "updatedAt" = ?
           WHERE "id" = ?"#,
    )
    .bind(now)
    .bind(now)
    .bind(flashcard_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

fn map_flashcard_row(row: &SqliteRow) -> Result<Flashcard, sqlx::Error> {
    let difficulty: String = row.try_get("difficulty").unwrap_or_default();

    Ok(Flashcard {
        id: row.try_get("id")?,
        study_plan_id: row.try_get("studyPlanId")?,
        front_text: row.try_get("frontText").unwrap_or_default(),
        back_text: row.try_get("backText").unwrap_or_default(),
        difficulty: Difficulty::from_str(&difficulty),
        mastery_level: row.try_get("masteryLevel").unwrap_or(0.0),
        times_studied: row.try_get("timesStudied").unwrap_or(0),
        last_studied: row.try_get("lastStudied").ok().flatten(),
    })
}
