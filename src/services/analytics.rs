use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::db::operations::{plans, profiles, tracking};
use crate::models::{LearnerProfile, TrackingEvent};
use crate::services::learner_profile::{self, ProfileError};
use crate::services::round_to;

const EVENT_WINDOW: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub event_window: i64,
    pub high_accuracy: f64,
    pub efficiency_boost: f64,
    pub max_efficiency: f64,
    pub low_accuracy: f64,
    pub efficiency_decay: f64,
    pub min_efficiency: f64,
    /// Moving-average weights of the stored strength and of the window accuracy.
    pub prior_weight: f64,
    pub recent_weight: f64,
    pub default_strength: f64,
    pub speed_scale: f64,
    pub speed_offset: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            event_window: EVENT_WINDOW,
            high_accuracy: 0.9,
            efficiency_boost: 1.05,
            max_efficiency: 2.0,
            low_accuracy: 0.6,
            efficiency_decay: 0.95,
            min_efficiency: 0.5,
            prior_weight: 0.8,
            recent_weight: 0.2,
            default_strength: 0.5,
            speed_scale: 20.0,
            speed_offset: 5.0,
        }
    }
}

/// Share of events answered correctly. Events without a verdict count as misses.
pub fn accuracy<'a, I>(events: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a TrackingEvent>,
{
    let (correct, total) = events.into_iter().fold((0usize, 0usize), |(c, t), e| {
        (c + usize::from(e.is_correct == Some(true)), t + 1)
    });
    (total > 0).then(|| correct as f64 / total as f64)
}

pub fn adjust_efficiency(current: f64, accuracy: f64, config: &AnalyticsConfig) -> f64 {
    if accuracy > config.high_accuracy {
        (current * config.efficiency_boost).min(config.max_efficiency)
    } else if accuracy < config.low_accuracy {
        (current * config.efficiency_decay).max(config.min_efficiency)
    } else {
        current
    }
}

pub fn blend_strength(old: f64, accuracy: f64, config: &AnalyticsConfig) -> f64 {
    old * config.prior_weight + accuracy * config.recent_weight
}

/// Items per hour for a subject, from the unrounded strength.
pub fn subject_speed(efficiency: f64, strength: f64, config: &AnalyticsConfig) -> f64 {
    round_to(config.speed_scale * efficiency * strength + config.speed_offset, 1)
}

/// Folds the user's recent tracking window into their learner profile.
///
/// Efficiency moves with overall accuracy. Only the subject of the newest
/// event's plan has its strength and speed recomputed, and only when that
/// plan has a category.
pub async fn update_after_session(
    conn: &mut SqliteConnection,
    user_id: &str,
    config: &AnalyticsConfig,
) -> Result<LearnerProfile, ProfileError> {
    let mut profile = learner_profile::get_or_create(&mut *conn, user_id).await?;

    let events = tracking::recent_for_user(&mut *conn, user_id, config.event_window).await?;
    let Some(overall) = accuracy(&events) else {
        return Ok(profile);
    };

    let before = profile.learning_efficiency_factor;
    profile.learning_efficiency_factor = adjust_efficiency(before, overall, config);

    let newest_plan_id = events[0].study_plan_id.clone();
    match plans::get_plan(&mut *conn, &newest_plan_id).await? {
        Some(plan) if plan.category.is_some() => {
            let subject = plan.subject_key();
            let plan_accuracy = accuracy(events.iter().filter(|e| e.study_plan_id == newest_plan_id))
                .unwrap_or(overall);
            let old = profile.strength_for(&subject).unwrap_or(config.default_strength);
            let blended = blend_strength(old, plan_accuracy, config);

            profile
                .subject_learning_speeds
                .insert(subject.clone(), subject_speed(profile.learning_efficiency_factor, blended, config));
            profile.subject_strengths.insert(subject.clone(), round_to(blended, 2));

            tracing::debug!(
                user_id = %user_id,
                subject = %subject,
                old,
                blended,
                plan_accuracy,
                "subject strength updated"
            );
        }
        Some(_) => {
            tracing::debug!(user_id = %user_id, plan_id = %newest_plan_id, "plan is uncategorized, skipping subject update");
        }
        None => {
            tracing::warn!(user_id = %user_id, plan_id = %newest_plan_id, "plan of newest event is gone, skipping subject update");
        }
    }

    profiles::update(&mut *conn, &profile).await?;

    tracing::info!(
        user_id = %user_id,
        events = events.len(),
        accuracy = overall,
        efficiency_before = before,
        efficiency = profile.learning_efficiency_factor,
        "learner profile updated"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn event(plan: &str, correct: Option<bool>) -> TrackingEvent {
        TrackingEvent {
            id: "e".to_string(),
            user_id: "u".to_string(),
            study_plan_id: plan.to_string(),
            mode: "quiz".to_string(),
            flashcard_id: None,
            is_correct: correct,
            response_time_ms: None,
            attempts_needed: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_accuracy_counts_missing_verdict_as_wrong() {
        let events = vec![event("p", Some(true)), event("p", None), event("p", Some(false)), event("p", Some(true))];
        assert_eq!(accuracy(&events), Some(0.5));
        assert_eq!(accuracy(&Vec::<TrackingEvent>::new()), None);
    }

    #[test]
    fn test_adjust_efficiency_bands() {
        let config = AnalyticsConfig::default();
        assert!((adjust_efficiency(1.0, 0.95, &config) - 1.05).abs() < 1e-12);
        assert_eq!(adjust_efficiency(1.98, 0.95, &config), 2.0);
        assert!((adjust_efficiency(1.0, 0.5, &config) - 0.95).abs() < 1e-12);
        assert_eq!(adjust_efficiency(0.51, 0.1, &config), 0.5);
        // boundaries are exclusive
        assert_eq!(adjust_efficiency(1.0, 0.9, &config), 1.0);
        assert_eq!(adjust_efficiency(1.0, 0.6, &config), 1.0);
    }

    #[test]
    fn test_blend_and_speed() {
        let config = AnalyticsConfig::default();
        let blended = blend_strength(0.5, 1.0, &config);
        assert!((blended - 0.6).abs() < 1e-12);
        assert_eq!(subject_speed(1.0, blended, &config), 17.0);
        assert_eq!(subject_speed(2.0, 0.5, &config), 25.0);
    }
}
