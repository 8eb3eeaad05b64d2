//! Unified application error model and mapping helpers.
//! Identity internals never surface errors past their entry points; this type
//! only describes what the HTTP surface reports to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::identity::ParseError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Auth { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. } | AppError::Auth { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. } | AppError::Auth { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }

    /// The one message every failed login gets, whatever the cause.
    pub fn invalid_credentials() -> Self {
        AppError::auth("invalid_credentials", "invalid credentials")
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Auth { .. } => 401,
        }
    }

    /// Short status word used in JSON bodies (`{"status": ...}`).
    pub fn status_label(&self) -> &'static str {
        match self {
            AppError::UserInput { .. } => "bad_request",
            AppError::Auth { .. } => "unauthorized",
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::user("bad_input".to_string(), err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": self.status_label(),
            "code": self.code_str(),
            "error": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
    }

    #[test]
    fn parse_errors_are_user_input() {
        let e: AppError = ParseError::UnknownFeature("payroll".into()).into();
        assert_eq!(e.http_status(), 400);
        assert_eq!(e.message(), "unknown feature: payroll");
    }

    #[test]
    fn invalid_credentials_is_generic() {
        let e = AppError::invalid_credentials();
        assert_eq!(e.status_label(), "unauthorized");
        assert_eq!(e.to_string(), "invalid_credentials: invalid credentials");
    }
}
