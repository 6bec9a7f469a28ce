#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tempfile::TempDir;

use studyplan_backend::config::EngineConfig;
use studyplan_backend::db::config::{DbConfig, SqliteJournalMode};
use studyplan_backend::db::operations::flashcards::{self, NewFlashcard, NewMcq};
use studyplan_backend::db::operations::plans::{self, NewPlan};
use studyplan_backend::db::operations::tracking;
use studyplan_backend::db::operations::users::{self, NewUser};
use studyplan_backend::db::DatabaseProxy;
use studyplan_backend::models::{
    Difficulty, Flashcard, LearningSpeed, MaterialCategory, PlanStatus, StudyPlan, TrackingEvent, User,
};
use studyplan_backend::state::AppState;
use studyplan_backend::workers::JobConfig;

fn test_config(database_url: String, journal_mode: SqliteJournalMode) -> DbConfig {
    DbConfig {
        database_url,
        max_connections: 4,
        busy_timeout: Duration::from_secs(5),
        acquire_timeout: Duration::from_secs(5),
        journal_mode,
        foreign_keys: true,
    }
}

/// Fresh migrated in-memory database on a single connection.
pub async fn memory_db() -> DatabaseProxy {
    DatabaseProxy::connect(&test_config("sqlite::memory:".to_string(), SqliteJournalMode::Memory))
        .await
        .expect("in-memory database")
}

/// File-backed database for tests that run background jobs next to requests.
pub async fn file_db() -> (DatabaseProxy, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("studyplan-test.db").display());
    let db = DatabaseProxy::connect(&test_config(url, SqliteJournalMode::Wal))
        .await
        .expect("file database");
    (db, dir)
}

pub fn fast_jobs() -> JobConfig {
    JobConfig {
        max_attempts: 2,
        backoff: Duration::from_millis(10),
        ..JobConfig::default()
    }
}

pub fn test_state(db: DatabaseProxy) -> AppState {
    AppState::new(db, EngineConfig::default(), fast_jobs())
}

pub fn test_app(db: DatabaseProxy) -> Router {
    studyplan_backend::app_with_state(test_state(db))
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date literal")
}

pub async fn seed_user(conn: &mut SqliteConnection, speed: LearningSpeed, hours: i64) -> User {
    users::insert_user(
        conn,
        NewUser {
            email: format!("{}@example.com", uuid::Uuid::new_v4()),
            learning_speed: speed,
            study_hours_per_week: hours,
        },
    )
    .await
    .expect("seed user")
}

pub async fn seed_plan(
    conn: &mut SqliteConnection,
    user_id: &str,
    category: Option<MaterialCategory>,
    exam_date: Option<NaiveDate>,
) -> StudyPlan {
    plans::insert_plan(
        conn,
        NewPlan {
            user_id: user_id.to_string(),
            name: "Spanish basics".to_string(),
            category,
            exam_date,
            status: PlanStatus::Active,
        },
    )
    .await
    .expect("seed plan")
}

pub async fn seed_cards(conn: &mut SqliteConnection, plan_id: &str, count: usize, mastery: f64) -> Vec<Flashcard> {
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let card = flashcards::insert_flashcard(
            &mut *conn,
            NewFlashcard {
                study_plan_id: plan_id.to_string(),
                front_text: format!("front {i}"),
                back_text: format!("back {i}"),
                difficulty: Difficulty::Medium,
                mastery_level: mastery,
            },
        )
        .await
        .expect("seed flashcard");
        out.push(card);
    }
    out
}

pub async fn seed_mcq(conn: &mut SqliteConnection, flashcard_id: &str, question: &str) {
    flashcards::insert_mcq(
        conn,
        NewMcq {
            flashcard_id: flashcard_id.to_string(),
            question_text: question.to_string(),
            options: vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
            correct_answer_index: 0,
            rationale: None,
        },
    )
    .await
    .expect("seed mcq");
}

pub async fn seed_event(
    conn: &mut SqliteConnection,
    user_id: &str,
    plan_id: &str,
    is_correct: Option<bool>,
    created_at: DateTime<Utc>,
) {
    let event = TrackingEvent {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        study_plan_id: plan_id.to_string(),
        mode: "quiz".to_string(),
        flashcard_id: None,
        is_correct,
        response_time_ms: Some(1200),
        attempts_needed: 1,
        created_at,
    };
    tracking::insert_event(conn, &event).await.expect("seed event");
}
