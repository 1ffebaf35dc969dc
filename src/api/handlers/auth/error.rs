//! Domain error taxonomy and the HTTP status mapping for it.
//!
//! Domain errors are constructed where they are detected and travel
//! unmodified to the boundary. Infrastructure errors surface as a generic
//! 500 and are never reinterpreted as domain errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use super::token::TokenError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    Admin,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Stable error body: a machine-readable code plus a message, with
/// per-field details for validation failures.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account already exists")]
    DuplicateAccount(PrincipalKind),
    #[error("account not found")]
    AccountNotFound(PrincipalKind),
    #[error("password mismatch")]
    InvalidCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("refresh token not found or already rotated")]
    TokenNotFound,
    #[error("insufficient role")]
    Forbidden,
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl AuthError {
    /// 400 for a request with no (or undecodable) JSON body.
    #[must_use]
    pub fn missing_body() -> Self {
        Self::Validation(vec![FieldError {
            field: "body".to_string(),
            message: "missing request body".to_string(),
        }])
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateAccount(_) => StatusCode::CONFLICT,
            Self::AccountNotFound(_) | Self::TokenNotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateAccount(PrincipalKind::User) => "DUPLICATED_USER",
            Self::DuplicateAccount(PrincipalKind::Admin) => "DUPLICATED_ADMIN",
            Self::AccountNotFound(PrincipalKind::User) => "USER_NOT_FOUND",
            Self::AccountNotFound(PrincipalKind::Admin) => "ADMIN_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_PASSWORD",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code().to_string();

        let body = match self {
            Self::Validation(fields) => ErrorResponse {
                code,
                message: "validation failed".to_string(),
                fields: Some(fields),
            },
            Self::Infrastructure(err) => {
                // Log the cause, hand the caller a generic message.
                error!("internal error: {err:?}");
                ErrorResponse {
                    code,
                    message: "internal error".to_string(),
                    fields: None,
                }
            }
            other => ErrorResponse {
                code,
                message: other.to_string(),
                fields: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_codes_match_contract() {
        assert_eq!(
            AuthError::DuplicateAccount(PrincipalKind::User).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::AccountNotFound(PrincipalKind::User).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken(TokenError::Expired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::TokenNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Infrastructure(anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_stable_per_principal() {
        assert_eq!(
            AuthError::DuplicateAccount(PrincipalKind::User).code(),
            "DUPLICATED_USER"
        );
        assert_eq!(
            AuthError::DuplicateAccount(PrincipalKind::Admin).code(),
            "DUPLICATED_ADMIN"
        );
        assert_eq!(
            AuthError::AccountNotFound(PrincipalKind::Admin).code(),
            "ADMIN_NOT_FOUND"
        );
        assert_eq!(
            AuthError::InvalidToken(TokenError::Malformed).code(),
            "INVALID_TOKEN"
        );
    }

    #[test]
    fn validation_body_carries_fields() {
        let err = AuthError::Validation(vec![FieldError {
            field: "phone".to_string(),
            message: "invalid phone number".to_string(),
        }]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_response_omits_absent_fields() {
        let body = ErrorResponse {
            code: "TOKEN_NOT_FOUND".to_string(),
            message: "gone".to_string(),
            fields: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("fields").is_none());
        assert_eq!(
            value.get("code").and_then(serde_json::Value::as_str),
            Some("TOKEN_NOT_FOUND")
        );
    }
}
