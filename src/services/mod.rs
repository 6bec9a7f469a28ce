pub mod analytics;
pub mod learner_profile;
pub mod pre_assessment;
pub mod schedule;
pub mod speed_model;
pub mod tracking;

/// Rounds to `decimals` places, halves away from zero.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
