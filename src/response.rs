use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::learner_profile::ProfileError;
use crate::services::pre_assessment::AssessmentError;
use crate::services::schedule::{ScheduleError, TaskError};
use crate::services::tracking::TrackingError;

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse { success: true, data })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> AppError {
    AppError::operational(status, code, message)
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<AssessmentError> for AppError {
    fn from(err: AssessmentError) -> Self {
        match err {
            AssessmentError::PlanNotFound(_) | AssessmentError::NotFound(_) => Self::not_found(err.to_string()),
            AssessmentError::NoFlashcards(_) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "NO_FLASHCARDS", err.to_string())
            }
            AssessmentError::AlreadyCompleted(_) => Self::conflict(err.to_string()),
            AssessmentError::Validation(msg) => Self::validation(msg),
            AssessmentError::Sql(e) => e.into(),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::PlanNotFound(_) | ScheduleError::UserNotFound(_) => Self::not_found(err.to_string()),
            ScheduleError::Sql(e) => e.into(),
        }
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(_) | TaskError::PlanNotFound(_) | TaskError::UserNotFound(_) => {
                Self::not_found(err.to_string())
            }
            TaskError::Sql(e) => e.into(),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::UserNotFound(_) => Self::not_found(err.to_string()),
            ProfileError::Validation(msg) => Self::validation(msg),
            ProfileError::Sql(e) => e.into(),
        }
    }
}

impl From<TrackingError> for AppError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::PlanNotFound(_) | TrackingError::FlashcardNotFound(_) | TrackingError::UserNotFound(_) => {
                Self::not_found(err.to_string())
            }
            TrackingError::Validation(msg) => Self::validation(msg),
            TrackingError::Sql(e) => e.into(),
        }
    }
}
