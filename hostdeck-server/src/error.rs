//! Erreurs HTTP: 400 pour une entrée invalide, 500 pour un échec en aval

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hostdeck_agent::{ContainerError, ValidationError};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ApiError {
    /// Validation failures keep their message (400). Runtime failures are
    /// logged and answered with `message` alone, never the runtime's stderr.
    pub fn from_container(e: ContainerError, message: &str) -> Self {
        match e {
            ContainerError::Validation(v) => v.into(),
            other => {
                error!("Container operation failed: {other}");
                Self::Internal(message.to_string())
            }
        }
    }
}

impl From<ContainerError> for ApiError {
    fn from(e: ContainerError) -> Self {
        Self::from_container(e, "Action failed")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let bad: ApiError = ContainerError::Validation(ValidationError::InvalidId).into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.to_string(), "Invalid container ID format");

        let failed: ApiError = ContainerError::UnexpectedOutput("x".into()).into();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.to_string(), "Action failed");
    }

    #[test]
    fn test_runtime_stderr_stays_out_of_body() {
        let exec = hostdeck_agent::ExecError::Failed {
            program: "docker".into(),
            code: Some(1),
            stderr: "Error response from daemon: secret detail".into(),
        };
        let err = ApiError::from_container(ContainerError::Command(exec), "Recreate failed");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Recreate failed");
    }
}
