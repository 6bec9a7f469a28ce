use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::db::operations::{assessments, flashcards, new_id, plans, profiles, tasks, users};
use crate::models::{StudyMode, Task, TaskType};
use crate::services::speed_model::{estimate_throughput, SpeedModelConfig};

const MASTERY_THRESHOLD: f64 = 70.0;
const DEFAULT_DAYS_AVAILABLE: i64 = 7;
const RECOGNITION_FRACTION: f64 = 0.3;
const RECALL_FRACTION: f64 = 0.4;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Cards below this mastery are still being learned.
    pub mastery_threshold: f64,
    pub default_days_available: i64,
    pub recognition_fraction: f64,
    pub recall_fraction: f64,
    pub min_phase_days: i64,
    pub recognition_minutes: i64,
    pub recall_minutes: i64,
    pub mastery_minutes: i64,
    pub task_priority: i64,
    pub speed: SpeedModelConfig,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: MASTERY_THRESHOLD,
            default_days_available: DEFAULT_DAYS_AVAILABLE,
            recognition_fraction: RECOGNITION_FRACTION,
            recall_fraction: RECALL_FRACTION,
            min_phase_days: 1,
            recognition_minutes: 20,
            recall_minutes: 30,
            mastery_minutes: 40,
            task_priority: 1,
            speed: SpeedModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSplit {
    pub recognition: i64,
    pub recall: i64,
    pub mastery: i64,
}

impl PhaseSplit {
    pub fn total(&self) -> i64 {
        self.recognition + self.recall + self.mastery
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub plan_id: String,
    pub tasks_created: usize,
    pub tasks_removed: u64,
    pub days_available: i64,
    pub phases: PhaseSplit,
    pub throughput: f64,
    pub daily_capacity: f64,
    pub learning_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// Every card is already above the mastery threshold; existing tasks were left alone.
    NothingToSchedule,
    Scheduled(ScheduleSummary),
}

impl ScheduleOutcome {
    pub fn tasks_created(&self) -> usize {
        match self {
            Self::NothingToSchedule => 0,
            Self::Scheduled(summary) => summary.tasks_created,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("study plan not found: {0}")]
    PlanNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("study plan not found: {0}")]
    PlanNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Whole calendar days until the exam, at least one; the configured default without an exam.
pub fn days_available(exam_date: Option<NaiveDate>, today: NaiveDate, config: &ScheduleConfig) -> i64 {
    match exam_date {
        Some(exam) => (exam - today).num_days().max(1),
        None => config.default_days_available,
    }
}

pub fn phase_split(days: i64, config: &ScheduleConfig) -> PhaseSplit {
    let recognition = ((days as f64 * config.recognition_fraction).floor() as i64).max(config.min_phase_days);
    let recall = ((days as f64 * config.recall_fraction).floor() as i64).max(config.min_phase_days);
    let mastery = (days - recognition - recall).max(0);
    PhaseSplit {
        recognition,
        recall,
        mastery,
    }
}

struct PhaseTemplate {
    days: i64,
    mode: StudyMode,
    task_type: TaskType,
    title: &'static str,
    minutes: i64,
    rationale: &'static str,
}

/// One task per phase day, numbered from 1 and dated from `today`.
pub fn build_tasks(
    plan_id: &str,
    split: PhaseSplit,
    learning_items: usize,
    today: NaiveDate,
    config: &ScheduleConfig,
) -> Vec<Task> {
    let phases = [
        PhaseTemplate {
            days: split.recognition,
            mode: StudyMode::Quiz,
            task_type: TaskType::MultipleChoiceQuiz,
            title: "Rapid Recognition",
            minutes: config.recognition_minutes,
            rationale: "Phase 1: Build recognition speed with multiple choice.",
        },
        PhaseTemplate {
            days: split.recall,
            mode: StudyMode::Learn,
            task_type: TaskType::FlashcardReview,
            title: "Active Recall",
            minutes: config.recall_minutes,
            rationale: "Phase 2: Strengthen memory connections with flashcards.",
        },
        PhaseTemplate {
            days: split.mastery,
            mode: StudyMode::Write,
            task_type: TaskType::WritingPractice,
            title: "Deep Mastery",
            minutes: config.mastery_minutes,
            rationale: "Phase 3: Prove mastery by writing answers.",
        },
    ];

    let description = format!("Adaptive session focusing on {learning_items} items.");
    let mut out = Vec::with_capacity(split.total().max(0) as usize);
    let mut day = 1i64;
    for phase in &phases {
        for _ in 0..phase.days {
            out.push(Task {
                id: new_id(),
                study_plan_id: plan_id.to_string(),
                title: phase.title.to_string(),
                description: Some(description.clone()),
                task_type: phase.task_type,
                mode: phase.mode,
                priority: config.task_priority,
                estimated_minutes: phase.minutes,
                day_number: Some(day),
                rationale: Some(phase.rationale.to_string()),
                completion_status: false,
                scheduled_date: Some(today + Duration::days(day - 1)),
                completed_at: None,
                order: 0,
            });
            day += 1;
        }
    }
    out
}

pub async fn generate_adaptive_schedule(
    conn: &mut SqliteConnection,
    plan_id: &str,
    config: &ScheduleConfig,
) -> Result<ScheduleOutcome, ScheduleError> {
    generate_adaptive_schedule_at(conn, plan_id, Utc::now().date_naive(), config).await
}

/// Rebuilds the incomplete part of a plan's schedule as of `today`.
pub async fn generate_adaptive_schedule_at(
    conn: &mut SqliteConnection,
    plan_id: &str,
    today: NaiveDate,
    config: &ScheduleConfig,
) -> Result<ScheduleOutcome, ScheduleError> {
    let plan = plans::get_plan(&mut *conn, plan_id)
        .await?
        .ok_or_else(|| ScheduleError::PlanNotFound(plan_id.to_string()))?;
    let user = users::get_user(&mut *conn, &plan.user_id)
        .await?
        .ok_or_else(|| ScheduleError::UserNotFound(plan.user_id.clone()))?;

    let learning_items = flashcards::list_for_plan(&mut *conn, plan_id)
        .await?
        .into_iter()
        .filter(|card| card.mastery_level < config.mastery_threshold)
        .count();
    if learning_items == 0 {
        tracing::info!(plan_id = %plan_id, "all cards mastered, nothing to schedule");
        return Ok(ScheduleOutcome::NothingToSchedule);
    }

    let days = days_available(plan.exam_date, today, config);

    let score = assessments::get_by_plan(&mut *conn, plan_id)
        .await?
        .filter(|a| a.is_completed())
        .map(|a| a.correct_score)
        .unwrap_or(0.0);
    let profile = profiles::get_by_user(&mut *conn, &user.id).await?;
    let throughput = estimate_throughput(profile.as_ref(), &plan.subject_key(), score, &config.speed);
    let daily_capacity = throughput * (user.study_hours_per_week as f64 / 7.0);

    let removed = tasks::delete_incomplete_for_plan(&mut *conn, plan_id).await?;

    let split = phase_split(days, config);
    let new_tasks = build_tasks(plan_id, split, learning_items, today, config);
    tasks::insert_tasks(&mut *conn, &new_tasks).await?;

    tracing::info!(
        plan_id = %plan_id,
        days,
        learning_items,
        throughput,
        daily_capacity,
        removed,
        created = new_tasks.len(),
        "adaptive schedule generated"
    );

    Ok(ScheduleOutcome::Scheduled(ScheduleSummary {
        plan_id: plan_id.to_string(),
        tasks_created: new_tasks.len(),
        tasks_removed: removed,
        days_available: days,
        phases: split,
        throughput,
        daily_capacity,
        learning_items,
    }))
}

pub async fn list_plan_tasks(conn: &mut SqliteConnection, plan_id: &str) -> Result<Vec<Task>, TaskError> {
    if plans::get_plan(&mut *conn, plan_id).await?.is_none() {
        return Err(TaskError::PlanNotFound(plan_id.to_string()));
    }
    Ok(tasks::list_for_plan(&mut *conn, plan_id).await?)
}

pub async fn list_today_tasks(
    conn: &mut SqliteConnection,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<Task>, TaskError> {
    if users::get_user(&mut *conn, user_id).await?.is_none() {
        return Err(TaskError::UserNotFound(user_id.to_string()));
    }
    Ok(tasks::list_due_for_user(&mut *conn, user_id, today).await?)
}

/// Marks a task done. Completing it twice keeps the first completion time.
pub async fn complete_task(conn: &mut SqliteConnection, task_id: &str) -> Result<Task, TaskError> {
    let now = Utc::now();
    if tasks::mark_completed(&mut *conn, task_id, now).await? {
        tracing::info!(task_id = %task_id, "task completed");
    }
    tasks::get_task(&mut *conn, task_id)
        .await?
        .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_phase_split_ten_days() {
        let split = phase_split(10, &ScheduleConfig::default());
        assert_eq!(
            split,
            PhaseSplit {
                recognition: 3,
                recall: 4,
                mastery: 3
            }
        );
    }

    #[test]
    fn test_phase_split_short_horizons() {
        let config = ScheduleConfig::default();
        assert_eq!(phase_split(1, &config).total(), 2);
        assert_eq!(phase_split(1, &config).mastery, 0);
        assert_eq!(phase_split(2, &config).mastery, 0);
        assert_eq!(
            phase_split(7, &config),
            PhaseSplit {
                recognition: 2,
                recall: 2,
                mastery: 3
            }
        );
    }

    #[test]
    fn test_days_available() {
        let config = ScheduleConfig::default();
        let today = date("2026-03-01");
        assert_eq!(days_available(None, today, &config), 7);
        assert_eq!(days_available(Some(date("2026-03-11")), today, &config), 10);
        assert_eq!(days_available(Some(today), today, &config), 1);
        assert_eq!(days_available(Some(date("2026-02-20")), today, &config), 1);
    }

    #[test]
    fn test_build_tasks_phases_and_dates() {
        let config = ScheduleConfig::default();
        let today = date("2026-03-01");
        let built = build_tasks("plan", phase_split(10, &config), 12, today, &config);

        assert_eq!(built.len(), 10);
        let days: Vec<i64> = built.iter().filter_map(|t| t.day_number).collect();
        assert_eq!(days, (1..=10).collect::<Vec<_>>());
        assert_eq!(built[0].scheduled_date, Some(today));
        assert_eq!(built[9].scheduled_date, Some(date("2026-03-10")));

        assert!(built[..3].iter().all(|t| t.mode == StudyMode::Quiz && t.estimated_minutes == 20));
        assert!(built[3..7].iter().all(|t| t.mode == StudyMode::Learn && t.title == "Active Recall"));
        assert!(built[7..].iter().all(|t| t.task_type == TaskType::WritingPractice));
        assert_eq!(
            built[0].description.as_deref(),
            Some("Adaptive session focusing on 12 items.")
        );
        assert!(built.iter().all(|t| t.priority == 1 && t.order == 0 && !t.completion_status));
    }

    proptest! {
        #[test]
        fn prop_phase_split_covers_horizon(days in 1i64..400) {
            let split = phase_split(days, &ScheduleConfig::default());
            prop_assert!(split.recognition >= 1);
            prop_assert!(split.recall >= 1);
            prop_assert!(split.mastery >= 0);
            prop_assert_eq!(split.total(), days.max(split.recognition + split.recall));
        }
    }
}
