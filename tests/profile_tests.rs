use studyplan_backend::db::operations::{flashcards, profiles, users};
use studyplan_backend::models::{LearningSpeed, MaterialCategory, StudyMode, SubjectKey};
use studyplan_backend::services::analytics::AnalyticsConfig;
use studyplan_backend::services::learner_profile::{
    complete_onboarding, get_or_create, get_profile, OnboardingInput, ProfileError,
};
use studyplan_backend::services::tracking::{record_event, TrackingError, TrackingInput};

mod common;

fn key(raw: &str) -> SubjectKey {
    SubjectKey::parse(raw).unwrap()
}

fn onboarding(speed: LearningSpeed, hours: i64, subjects: &[&str]) -> OnboardingInput {
    OnboardingInput {
        learning_speed: speed,
        study_hours_per_week: hours,
        preferred_study_modes: vec![StudyMode::Quiz, StudyMode::Write],
        favorite_subjects: subjects.iter().map(|s| s.to_string()).collect(),
        study_time_preference: Some("evening".to_string()),
    }
}

fn tracking_input(plan_id: &str, flashcard_id: Option<&str>, correct: bool) -> TrackingInput {
    TrackingInput {
        study_plan_id: plan_id.to_string(),
        mode: StudyMode::Quiz,
        flashcard_id: flashcard_id.map(str::to_string),
        is_correct: Some(correct),
        response_time_ms: Some(2400),
        attempts_needed: 1,
    }
}

#[tokio::test]
async fn test_onboarding_creates_profile_with_favorites() {
    let db = common::memory_db().await;
    let mut tx = db.begin().await.unwrap();
    let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 5).await;

    let result = complete_onboarding(
        &mut tx,
        &user.id,
        onboarding(LearningSpeed::Fast, 12, &["Vocabulary", "world history", "vocabulary"]),
    )
    .await
    .unwrap();

    assert!(result.user.onboarding_completed);
    assert!(result.user.onboarding_date.is_some());
    assert_eq!(result.user.learning_speed, LearningSpeed::Fast);
    assert_eq!(result.user.study_hours_per_week, 12);
    assert_eq!(result.user.favorite_subjects, vec![key("vocabulary"), key("world_history")]);
    assert_eq!(result.user.study_time_preference.as_deref(), Some("evening"));

    let profile = get_profile(&mut tx, &user.id).await.unwrap().unwrap();
    assert_eq!(profile.self_reported_speed, Some(LearningSpeed::Fast));
    assert_eq!(profile.learning_efficiency_factor, 1.0);
    assert_eq!(profile.subject_strengths.len(), 2);
    assert_eq!(profile.strength_for(&key("vocabulary")), Some(0.7));
    assert_eq!(profile.strength_for(&key("world_history")), Some(0.7));
}

#[tokio::test]
async fn test_onboarding_keeps_existing_history() {
    let db = common::memory_db().await;
    let mut tx = db.begin().await.unwrap();
    let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 5).await;

    let mut profile = get_or_create(&mut tx, &user.id).await.unwrap();
    profile.learning_efficiency_factor = 1.3;
    profile.subject_strengths.insert(key("vocabulary"), 0.9);
    profile.subject_strengths.insert(key("facts"), 0.2);
    profile.subject_strengths.insert(key("grammar"), 0.4);
    profiles::update(&mut tx, &profile).await.unwrap();

    let result = complete_onboarding(
        &mut tx,
        &user.id,
        onboarding(LearningSpeed::Slow, 3, &["vocabulary", "facts"]),
    )
    .await
    .unwrap();

    let profile = result.profile;
    assert_eq!(profile.self_reported_speed, Some(LearningSpeed::Slow));
    assert_eq!(profile.learning_efficiency_factor, 1.3);
    assert_eq!(profile.strength_for(&key("vocabulary")), Some(0.9));
    assert_eq!(profile.strength_for(&key("facts")), Some(0.7));
    assert_eq!(profile.strength_for(&key("grammar")), Some(0.4));

    let stored = profiles::get_by_user(&mut tx, &user.id).await.unwrap().unwrap();
    assert_eq!(stored.subject_strengths, profile.subject_strengths);
    assert_eq!(stored.id, profile.id);
}

#[tokio::test]
async fn test_onboarding_rejects_bad_input() {
    let db = common::memory_db().await;
    let mut tx = db.begin().await.unwrap();
    let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 5).await;

    let unknown = complete_onboarding(&mut tx, "ghost", onboarding(LearningSpeed::Fast, 5, &[])).await;
    assert!(matches!(unknown, Err(ProfileError::UserNotFound(_))));

    let too_many_hours =
        complete_onboarding(&mut tx, &user.id, onboarding(LearningSpeed::Fast, 200, &[])).await;
    assert!(matches!(too_many_hours, Err(ProfileError::Validation(_))));

    let bad_subject =
        complete_onboarding(&mut tx, &user.id, onboarding(LearningSpeed::Fast, 5, &["maths!"])).await;
    assert!(matches!(bad_subject, Err(ProfileError::Validation(_))));

    let untouched = users::get_user(&mut tx, &user.id).await.unwrap().unwrap();
    assert!(!untouched.onboarding_completed);
    assert!(get_profile(&mut tx, &user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_tracking_records_study_and_updates_profile() {
    let db = common::memory_db().await;
    let mut tx = db.begin().await.unwrap();
    let user = common::seed_user(&mut tx, LearningSpeed::Moderate, 5).await;
    let plan = common::seed_plan(&mut tx, &user.id, Some(MaterialCategory::Vocabulary), None).await;
    let cards = common::seed_cards(&mut tx, &plan.id, 1, 20.0).await;

    let receipt = record_event(
        &mut tx,
        &user.id,
        tracking_input(&plan.id, Some(&cards[0].id), true),
        &AnalyticsConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(receipt.event.mode, "quiz");
    assert_eq!(receipt.event.study_plan_id, plan.id);
    // one correct event: accuracy 1.0
    assert!((receipt.profile.learning_efficiency_factor - 1.05).abs() < 1e-9);
    assert_eq!(receipt.profile.strength_for(&key("vocabulary")), Some(0.6));

    let card = flashcards::get_flashcard(&mut tx, &cards[0].id).await.unwrap().unwrap();
    assert_eq!(card.times_studied, 1);
    assert!(card.last_studied.is_some());
    assert_eq!(card.mastery_level, 20.0);
}

#[tokio::test]
async fn test_tracking_rejects_foreign_plan_and_card() {
    let db = common::memory_db().await;
    let mut tx = db.begin().await.unwrap();
    let owner = common::seed_user(&mut tx, LearningSpeed::Moderate, 5).await;
    let other = common::seed_user(&mut tx, LearningSpeed::Moderate, 5).await;
    let plan = common::seed_plan(&mut tx, &owner.id, None, None).await;
    let other_plan = common::seed_plan(&mut tx, &owner.id, None, None).await;
    let stray = common::seed_cards(&mut tx, &other_plan.id, 1, 0.0).await;
    let config = AnalyticsConfig::default();

    let foreign_plan = record_event(&mut tx, &other.id, tracking_input(&plan.id, None, true), &config).await;
    assert!(matches!(foreign_plan, Err(TrackingError::PlanNotFound(_))));

    let foreign_card = record_event(
        &mut tx,
        &owner.id,
        tracking_input(&plan.id, Some(&stray[0].id), true),
        &config,
    )
    .await;
    assert!(matches!(foreign_card, Err(TrackingError::FlashcardNotFound(_))));

    let mut bad_attempts = tracking_input(&plan.id, None, true);
    bad_attempts.attempts_needed = 0;
    let invalid = record_event(&mut tx, &owner.id, bad_attempts, &config).await;
    assert!(matches!(invalid, Err(TrackingError::Validation(_))));

    let card = flashcards::get_flashcard(&mut tx, &stray[0].id).await.unwrap().unwrap();
    assert_eq!(card.times_studied, 0);
    assert!(get_profile(&mut tx, &owner.id).await.unwrap().is_none());
}
