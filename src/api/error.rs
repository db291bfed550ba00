use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use curricula_core::models::ErrorBody;
use curricula_core::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("not allowed to perform this action")]
    Forbidden,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Link(e) => e.code(),
            Self::Forbidden => "forbidden",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::InvalidBody(_) => "invalid_body",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Link(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::Link(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Link(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!(code = self.code(), "request rejected: {}", self);
        }
        let message = if status.is_server_error() {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: self.code().to_string(),
            message: Some(message),
        };
        (status, Json(body)).into_response()
    }
}
