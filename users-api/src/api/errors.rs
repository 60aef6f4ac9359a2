use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use common_cache::ResolveError;
use common_redis::CustomRedisError;
use thiserror::Error;

use crate::types::ErrorResponse;
use crate::users::user_source::UserError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("User not found")]
    UserNotFound,
    #[error("Name and email are required")]
    MissingFields,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("User database unavailable")]
    SourceUnavailable,
    #[error("User database timed out")]
    SourceTimeout,
    #[error("Cache error: {0}")]
    Cache(#[from] CustomRedisError),
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => ApiError::UserNotFound,
            UserError::MissingFields => ApiError::MissingFields,
            UserError::Unavailable => ApiError::SourceUnavailable,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<ResolveError<UserError>> for ApiError {
    fn from(err: ResolveError<UserError>) -> Self {
        match err {
            ResolveError::Source(e) => e.into(),
            ResolveError::SourceTimeout(_) => ApiError::SourceTimeout,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::MissingFields | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::SourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::SourceTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ApiError::Cache(e) => {
                tracing::error!(error = %e, "Cache admin operation failed");
                "Internal server error".to_string()
            }
            ApiError::SourceUnavailable | ApiError::SourceTimeout => {
                tracing::warn!(error = %self, "User database did not answer");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
