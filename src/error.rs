use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the auth, session and message layers.
///
/// Everything except `System` is an expected, user-facing rejection and is
/// rendered with its display text. `System` carries the diagnostic chain,
/// which is logged and never sent to the client.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown email and wrong password both map here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid secret code")]
    WrongCode,

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0:#}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthenticated | AppError::WrongCode => {
                StatusCode::UNAUTHORIZED
            }
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::System(e) => {
                error!(error = %format!("{e:#}"), "request failed");
                (status, "Internal server error".to_string()).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
