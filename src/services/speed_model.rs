use serde::{Deserialize, Serialize};

use crate::models::{LearnerProfile, LearningSpeed, SubjectKey};
use crate::services::round_to;

const BASE_RATE_SLOW: f64 = 12.0;
const BASE_RATE_MODERATE: f64 = 20.0;
const BASE_RATE_FAST: f64 = 30.0;
const DEFAULT_SUBJECT_STRENGTH: f64 = 0.5;

/// Items-per-hour model constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedModelConfig {
    pub base_rate_slow: f64,
    pub base_rate_moderate: f64,
    pub base_rate_fast: f64,
    pub default_subject_strength: f64,
    pub strong_subject_threshold: f64,
    pub strong_subject_multiplier: f64,
    pub weak_subject_threshold: f64,
    pub weak_subject_multiplier: f64,
    pub high_score_threshold: f64,
    pub high_score_multiplier: f64,
    pub mid_score_threshold: f64,
    pub mid_score_multiplier: f64,
}

impl Default for SpeedModelConfig {
    fn default() -> Self {
        Self {
            base_rate_slow: BASE_RATE_SLOW,
            base_rate_moderate: BASE_RATE_MODERATE,
            base_rate_fast: BASE_RATE_FAST,
            default_subject_strength: DEFAULT_SUBJECT_STRENGTH,
            strong_subject_threshold: 0.7,
            strong_subject_multiplier: 1.25,
            weak_subject_threshold: 0.3,
            weak_subject_multiplier: 0.8,
            high_score_threshold: 80.0,
            high_score_multiplier: 1.5,
            mid_score_threshold: 50.0,
            mid_score_multiplier: 1.2,
        }
    }
}

impl SpeedModelConfig {
    pub fn base_rate(&self, speed: Option<LearningSpeed>) -> f64 {
        match speed {
            Some(LearningSpeed::Fast) => self.base_rate_fast,
            Some(LearningSpeed::Slow) => self.base_rate_slow,
            Some(LearningSpeed::Moderate) | None => self.base_rate_moderate,
        }
    }

    pub fn subject_multiplier(&self, strength: f64) -> f64 {
        if strength > self.strong_subject_threshold {
            self.strong_subject_multiplier
        } else if strength < self.weak_subject_threshold {
            self.weak_subject_multiplier
        } else {
            1.0
        }
    }

    pub fn assessment_multiplier(&self, score: f64) -> f64 {
        if score > self.high_score_threshold {
            self.high_score_multiplier
        } else if score > self.mid_score_threshold {
            self.mid_score_multiplier
        } else {
            1.0
        }
    }
}

/// Estimated items per hour for `subject`, rounded to one decimal.
///
/// A missing profile behaves like a moderate learner of average strength.
/// The result is not clamped.
pub fn estimate_throughput(
    profile: Option<&LearnerProfile>,
    subject: &SubjectKey,
    pre_assessment_score: f64,
    config: &SpeedModelConfig,
) -> f64 {
    let speed = profile.and_then(|p| p.self_reported_speed);
    let strength = profile
        .and_then(|p| p.strength_for(subject))
        .unwrap_or(config.default_subject_strength);

    let base = config.base_rate(speed);
    let rate = base
        * config.subject_multiplier(strength)
        * config.assessment_multiplier(pre_assessment_score);

    tracing::debug!(
        subject = %subject,
        base,
        strength,
        score = pre_assessment_score,
        rate,
        "throughput estimated"
    );
    round_to(rate, 1)
}
