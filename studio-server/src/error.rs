//! API errors and their HTTP rendering
//!
//! Every error renders as `{ "error": <category code>, "message": <user message> }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use studio_gate::{ErrorCategory, GateError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session not found")]
    SessionNotFound,

    #[error(transparent)]
    Gate(#[from] GateError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Gate(GateError::ActorUnavailable(_)) => StatusCode::GONE,
            Self::Gate(e) => match e.category() {
                ErrorCategory::Validation => StatusCode::BAD_REQUEST,
                ErrorCategory::Auth => StatusCode::UNAUTHORIZED,
                ErrorCategory::Forbidden => StatusCode::FORBIDDEN,
                ErrorCategory::Database => StatusCode::BAD_GATEWAY,
                ErrorCategory::Network => StatusCode::SERVICE_UNAVAILABLE,
                ErrorCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "NOT_FOUND",
            Self::Gate(e) => e.category().code(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::SessionNotFound => "Your session has expired. Please reload the page.".into(),
            Self::Gate(e) => e.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = json!({
            "error": self.code(),
            "message": self.user_message(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_by_category() {
        assert_eq!(ApiError::from(GateError::InvalidPasscode).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(GateError::NotSignedIn).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(GateError::Forbidden("admin".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(GateError::Network("timeout".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::SessionNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_body_uses_user_message() {
        let err = ApiError::from(GateError::Auth {
            message: "Email not confirmed".into(),
            code: None,
        });
        assert_eq!(err.code(), "AUTH_ERROR");
        assert_eq!(
            err.user_message(),
            "Please check your email and confirm your account before signing in."
        );
    }
}
