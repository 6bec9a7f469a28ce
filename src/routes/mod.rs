mod assessments;
mod health;
mod plans;
mod tasks;
mod users;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/plans/:planId/pre-assessment",
            get(assessments::get_for_plan).post(assessments::generate),
        )
        .route(
            "/api/pre-assessments/:assessmentId/submit",
            post(assessments::submit),
        )
        .route("/api/plans/:planId/schedule", post(plans::regenerate_schedule))
        .route("/api/plans/:planId/status", get(plans::status))
        .route("/api/plans/:planId/tasks", get(plans::list_tasks))
        .route("/api/tasks/:taskId/complete", post(tasks::complete))
        .route("/api/users/:userId/tasks/today", get(tasks::today))
        .route("/api/users/:userId/onboarding", post(users::onboarding))
        .route("/api/users/:userId/profile", get(users::profile))
        .route("/api/users/:userId/tracking", post(users::track))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
