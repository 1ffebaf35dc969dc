//! Request/response types for auth endpoints, with per-field validation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::entity::AdminRole;
use super::error::{AuthError, FieldError};

pub(super) fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+?[0-9]{8,15}$").is_ok_and(|regex| regex.is_match(phone))
}

/// At least 8 characters with one letter and one digit.
pub(super) fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn check(valid: bool, field: &str, message: &str, errors: &mut Vec<FieldError>) {
    if !valid {
        errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), AuthError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub phone: String,
    pub password: String,
    pub name: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        check(valid_phone(&self.phone), "phone", "invalid phone number", &mut errors);
        check(
            valid_password(&self.password),
            "password",
            "must be at least 8 characters with a letter and a digit",
            &mut errors,
        );
        check(!self.name.trim().is_empty(), "name", "must not be empty", &mut errors);
        finish(errors)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub phone: String,
    pub password: String,
}

impl SignInRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        check(valid_phone(&self.phone), "phone", "invalid phone number", &mut errors);
        check(!self.password.is_empty(), "password", "must not be empty", &mut errors);
        finish(errors)
    }
}

/// Body form of sign-out; the Bearer header form needs no body at all.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignOutRequest {
    pub refresh_token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminSignInRequest {
    pub username: String,
    pub password: String,
}

impl AdminSignInRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        check(!self.username.trim().is_empty(), "username", "must not be empty", &mut errors);
        check(!self.password.is_empty(), "password", "must not be empty", &mut errors);
        finish(errors)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreateRequest {
    pub username: String,
    pub password: String,
    pub name: String,
}

impl AdminCreateRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        check(!self.username.trim().is_empty(), "username", "must not be empty", &mut errors);
        check(
            valid_password(&self.password),
            "password",
            "must be at least 8 characters with a letter and a digit",
            &mut errors,
        );
        check(!self.name.trim().is_empty(), "name", "must not be empty", &mut errors);
        finish(errors)
    }
}

/// Token pair plus account details, returned by user sign-up and sign-in.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub phone: String,
    pub name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub admin_id: String,
    pub username: String,
    pub name: String,
    pub role: AdminRole,
    pub created_at: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

/// Account details without credentials, for self-lookup and admin lookup.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub phone: String,
    pub name: String,
    pub status: String,
    pub created_at: i64,
}

impl From<super::entity::User> for UserResponse {
    fn from(user: super::entity::User) -> Self {
        Self {
            user_id: user.user_id,
            phone: user.phone,
            name: user.name,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

/// Query for the admin user endpoint: a single lookup when `phone` or
/// `userId` is present, a paged listing otherwise.
#[derive(IntoParams, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsersQuery {
    pub phone: Option<String>,
    pub user_id: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub page: i64,
    pub size: i64,
    pub total_count: i64,
    pub users: Vec<UserResponse>,
}
