use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ========== Enums ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningSpeed {
    Slow,
    #[default]
    Moderate,
    Fast,
}

impl LearningSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Moderate => "moderate",
            Self::Fast => "fast",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "slow" => Self::Slow,
            "fast" => Self::Fast,
            _ => Self::Moderate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    Vocabulary,
    GrammarMathLogic,
    Facts,
    Other,
}

impl MaterialCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vocabulary => "vocabulary",
            Self::GrammarMathLogic => "grammar_math_logic",
            Self::Facts => "facts",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "vocabulary" => Some(Self::Vocabulary),
            "grammar_math_logic" => Some(Self::GrammarMathLogic),
            "facts" => Some(Self::Facts),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Generating,
    AwaitingApproval,
    Active,
    Completed,
    GenerationFailed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::GenerationFailed => "generation_failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "generating" => Self::Generating,
            "awaiting_approval" => Self::AwaitingApproval,
            "completed" => Self::Completed,
            "generation_failed" => Self::GenerationFailed,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    Learn,
    Quiz,
    Match,
    Write,
    FillGaps,
    ShortTest,
    LongTest,
    PreAssessment,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learn => "learn",
            Self::Quiz => "quiz",
            Self::Match => "match",
            Self::Write => "write",
            Self::FillGaps => "fill_gaps",
            Self::ShortTest => "short_test",
            Self::LongTest => "long_test",
            Self::PreAssessment => "pre_assessment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "learn" => Some(Self::Learn),
            "quiz" => Some(Self::Quiz),
            "match" => Some(Self::Match),
            "write" => Some(Self::Write),
            "fill_gaps" => Some(Self::FillGaps),
            "short_test" => Some(Self::ShortTest),
            "long_test" => Some(Self::LongTest),
            "pre_assessment" => Some(Self::PreAssessment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FlashcardReview,
    MultipleChoiceQuiz,
    MatchingGame,
    WritingPractice,
    FillTheGap,
    ShortTest,
    ComprehensiveTest,
    PreAssessment,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashcardReview => "flashcard_review",
            Self::MultipleChoiceQuiz => "multiple_choice_quiz",
            Self::MatchingGame => "matching_game",
            Self::WritingPractice => "writing_practice",
            Self::FillTheGap => "fill_the_gap",
            Self::ShortTest => "short_test",
            Self::ComprehensiveTest => "comprehensive_test",
            Self::PreAssessment => "pre_assessment",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice_quiz" => Self::MultipleChoiceQuiz,
            "matching_game" => Self::MatchingGame,
            "writing_practice" => Self::WritingPractice,
            "fill_the_gap" => Self::FillTheGap,
            "short_test" => Self::ShortTest,
            "comprehensive_test" => Self::ComprehensiveTest,
            "pre_assessment" => Self::PreAssessment,
            _ => Self::FlashcardReview,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Pending,
    Completed,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("completed") {
            Self::Completed
        } else {
            Self::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Mcq,
    Flashcard,
}

// ========== Subject keys ==========

/// Normalized key for a subject, e.g. `vocabulary` or `grammar_math_logic`.
///
/// Keys are lower-case ASCII alphanumerics and underscores; whitespace and
/// hyphens fold to `_`. Every map keyed by subject goes through this type,
/// so `"Vocabulary"` and `"vocabulary"` can never coexist in a profile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectKey(String);

pub const GENERAL_SUBJECT: &str = "general";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid subject key: {0:?}")]
pub struct InvalidSubjectKey(pub String);

impl SubjectKey {
    pub fn parse(raw: &str) -> Result<Self, InvalidSubjectKey> {
        let folded: String = raw
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        if folded.is_empty()
            || !folded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(InvalidSubjectKey(raw.to_string()));
        }
        Ok(Self(folded))
    }

    pub fn general() -> Self {
        Self(GENERAL_SUBJECT.to_string())
    }

    /// Subject key of a plan: its category, or `general` when uncategorized.
    pub fn for_category(category: Option<MaterialCategory>) -> Self {
        match category {
            Some(category) => Self(category.as_str().to_string()),
            None => Self::general(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectKey {
    type Error = InvalidSubjectKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubjectKey> for String {
    fn from(key: SubjectKey) -> Self {
        key.0
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ========== Records ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub learning_speed: LearningSpeed,
    pub study_hours_per_week: i64,
    pub preferred_study_modes: Vec<StudyMode>,
    pub favorite_subjects: Vec<SubjectKey>,
    pub study_time_preference: Option<String>,
    pub onboarding_completed: bool,
    pub onboarding_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: Option<MaterialCategory>,
    pub exam_date: Option<NaiveDate>,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudyPlan {
    pub fn subject_key(&self) -> SubjectKey {
        SubjectKey::for_category(self.category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub study_plan_id: String,
    pub front_text: String,
    pub back_text: String,
    pub difficulty: Difficulty,
    pub mastery_level: f64,
    pub times_studied: i64,
    pub last_studied: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqQuestion {
    pub id: String,
    pub flashcard_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer_index: i64,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub id: String,
    pub user_id: String,
    pub self_reported_speed: Option<LearningSpeed>,
    pub subject_strengths: BTreeMap<SubjectKey, f64>,
    pub subject_learning_speeds: BTreeMap<SubjectKey, f64>,
    pub learning_efficiency_factor: f64,
    pub mode_performance: BTreeMap<StudyMode, f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearnerProfile {
    pub fn strength_for(&self, subject: &SubjectKey) -> Option<f64> {
        self.subject_strengths.get(subject).copied()
    }
}

/// One frozen entry of a pre-assessment snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentQuestion {
    pub flashcard_id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub back_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreAssessment {
    pub id: String,
    pub study_plan_id: String,
    pub status: AssessmentStatus,
    pub total_questions: i64,
    pub correct_score: f64,
    pub questions_data: Vec<AssessmentQuestion>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PreAssessment {
    pub fn is_completed(&self) -> bool {
        self.status == AssessmentStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreAssessmentResponse {
    pub id: String,
    pub pre_assessment_id: String,
    pub flashcard_id: String,
    pub is_correct: bool,
    pub response_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub study_plan_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub mode: StudyMode,
    pub priority: i64,
    pub estimated_minutes: i64,
    pub day_number: Option<i64>,
    pub rationale: Option<String>,
    pub completion_status: bool,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub id: String,
    pub user_id: String,
    pub study_plan_id: String,
    pub mode: String,
    pub flashcard_id: Option<String>,
    pub is_correct: Option<bool>,
    pub response_time_ms: Option<i64>,
    pub attempts_needed: i64,
    pub created_at: DateTime<Utc>,
}
