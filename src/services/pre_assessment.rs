use std::collections::HashSet;

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::db::operations::{assessments, flashcards, new_id, plans};
use crate::models::{
    AssessmentQuestion, AssessmentStatus, Difficulty, Flashcard, McqQuestion, PreAssessment,
    QuestionKind,
};

const SAMPLE_FRACTION: f64 = 0.25;
const MIN_SAMPLE: usize = 5;
const MAX_SAMPLE: usize = 20;
const CORRECT_MASTERY: f64 = 80.0;
const INCORRECT_MASTERY: f64 = 0.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub sample_fraction: f64,
    pub min_sample: usize,
    pub max_sample: usize,
    pub correct_mastery: f64,
    pub incorrect_mastery: f64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            sample_fraction: SAMPLE_FRACTION,
            min_sample: MIN_SAMPLE,
            max_sample: MAX_SAMPLE,
            correct_mastery: CORRECT_MASTERY,
            incorrect_mastery: INCORRECT_MASTERY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("study plan not found: {0}")]
    PlanNotFound(String),
    #[error("study plan {0} has no flashcards")]
    NoFlashcards(String),
    #[error("pre-assessment not found: {0}")]
    NotFound(String),
    #[error("pre-assessment already completed: {0}")]
    AlreadyCompleted(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
}

/// One graded answer from the learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentAnswer {
    pub flashcard_id: String,
    pub is_correct: bool,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
}

/// `clamp(round(fraction * n), min, max)`, never more than `n`.
pub fn sample_size(n: usize, config: &AssessmentConfig) -> usize {
    let raw = (config.sample_fraction * n as f64).round() as usize;
    raw.clamp(config.min_sample, config.max_sample).min(n)
}

/// Uniform sample without replacement.
pub fn select_sample<R: Rng + ?Sized>(cards: &[Flashcard], size: usize, rng: &mut R) -> Vec<Flashcard> {
    cards.choose_multiple(rng, size).cloned().collect()
}

fn render_question(card: &Flashcard, mcq: Option<&McqQuestion>) -> AssessmentQuestion {
    match mcq {
        Some(mcq) => AssessmentQuestion {
            flashcard_id: card.id.clone(),
            kind: QuestionKind::Mcq,
            text: mcq.question_text.clone(),
            options: mcq.options.clone(),
            back_text: card.back_text.clone(),
        },
        None => AssessmentQuestion {
            flashcard_id: card.id.clone(),
            kind: QuestionKind::Flashcard,
            text: card.front_text.clone(),
            options: Vec::new(),
            back_text: card.back_text.clone(),
        },
    }
}

pub fn score_percentage(correct: usize, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

pub async fn get_for_plan(
    conn: &mut SqliteConnection,
    plan_id: &str,
) -> Result<Option<PreAssessment>, AssessmentError> {
    Ok(assessments::get_by_plan(&mut *conn, plan_id).await?)
}

/// Returns the plan's pre-assessment, creating and snapshotting it on first call.
pub async fn generate_pre_assessment(
    conn: &mut SqliteConnection,
    plan_id: &str,
    config: &AssessmentConfig,
) -> Result<PreAssessment, AssessmentError> {
    if let Some(existing) = assessments::get_by_plan(&mut *conn, plan_id).await? {
        tracing::debug!(plan_id = %plan_id, assessment_id = %existing.id, "pre-assessment already exists");
        return Ok(existing);
    }

    if plans::get_plan(&mut *conn, plan_id).await?.is_none() {
        return Err(AssessmentError::PlanNotFound(plan_id.to_string()));
    }

    let cards = flashcards::list_for_plan(&mut *conn, plan_id).await?;
    if cards.is_empty() {
        return Err(AssessmentError::NoFlashcards(plan_id.to_string()));
    }

    let size = sample_size(cards.len(), config);
    let sampled = {
        let mut rng = rand::rng();
        select_sample(&cards, size, &mut rng)
    };

    let mcqs = flashcards::first_mcq_per_flashcard(&mut *conn, plan_id).await?;
    let questions: Vec<AssessmentQuestion> = sampled
        .iter()
        .map(|card| render_question(card, mcqs.get(&card.id)))
        .collect();

    let assessment = PreAssessment {
        id: new_id(),
        study_plan_id: plan_id.to_string(),
        status: AssessmentStatus::Pending,
        total_questions: questions.len() as i64,
        correct_score: 0.0,
        questions_data: questions,
        created_at: Utc::now(),
        completed_at: None,
    };

    if assessments::insert_if_absent(&mut *conn, &assessment).await? {
        tracing::info!(
            plan_id = %plan_id,
            assessment_id = %assessment.id,
            questions = assessment.total_questions,
            pool = cards.len(),
            "pre-assessment generated"
        );
        return Ok(assessment);
    }

    // Another generator won the race; its row is the assessment.
    tracing::info!(plan_id = %plan_id, "pre-assessment created concurrently, returning stored one");
    assessments::get_by_plan(&mut *conn, plan_id)
        .await?
        .ok_or(AssessmentError::Sql(sqlx::Error::RowNotFound))
}

/// Grades a pending pre-assessment and overwrites the mastery of every answered card.
pub async fn submit_pre_assessment(
    conn: &mut SqliteConnection,
    assessment_id: &str,
    answers: &[AssessmentAnswer],
    config: &AssessmentConfig,
) -> Result<PreAssessment, AssessmentError> {
    let mut assessment = assessments::get_by_id(&mut *conn, assessment_id)
        .await?
        .ok_or_else(|| AssessmentError::NotFound(assessment_id.to_string()))?;

    if assessment.is_completed() {
        return Err(AssessmentError::AlreadyCompleted(assessment_id.to_string()));
    }

    let sampled: HashSet<&str> = assessment
        .questions_data
        .iter()
        .map(|q| q.flashcard_id.as_str())
        .collect();
    let mut answered: HashSet<&str> = HashSet::with_capacity(answers.len());
    for answer in answers {
        if !sampled.contains(answer.flashcard_id.as_str()) {
            return Err(AssessmentError::Validation(format!(
                "flashcard {} is not part of this assessment",
                answer.flashcard_id
            )));
        }
        if !answered.insert(answer.flashcard_id.as_str()) {
            return Err(AssessmentError::Validation(format!(
                "flashcard {} answered more than once",
                answer.flashcard_id
            )));
        }
    }

    let now = Utc::now();
    let mut correct = 0usize;
    for answer in answers {
        assessments::insert_response(
            &mut *conn,
            assessment_id,
            &answer.flashcard_id,
            answer.is_correct,
            answer.response_time_ms,
            now,
        )
        .await?;

        let (mastery, difficulty) = if answer.is_correct {
            correct += 1;
            (config.correct_mastery, Some(Difficulty::Easy))
        } else {
            (config.incorrect_mastery, None)
        };
        flashcards::apply_assessment_grade(&mut *conn, &answer.flashcard_id, mastery, difficulty, now).await?;
    }

    let score = score_percentage(correct, assessment.total_questions);
    if !assessments::mark_completed(&mut *conn, assessment_id, score, now).await? {
        return Err(AssessmentError::AlreadyCompleted(assessment_id.to_string()));
    }

    tracing::info!(
        assessment_id = %assessment_id,
        plan_id = %assessment.study_plan_id,
        correct,
        total = assessment.total_questions,
        score,
        "pre-assessment submitted"
    );

    assessment.status = AssessmentStatus::Completed;
    assessment.correct_score = score;
    assessment.completed_at = Some(now);
    Ok(assessment)
}
