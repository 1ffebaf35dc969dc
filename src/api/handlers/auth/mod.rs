//! Auth handlers and supporting modules.
//!
//! ## Token Lifecycle
//!
//! Sign-up and sign-in issue an access/refresh pair and persist the refresh
//! token. Refresh is rotate-on-use: the presented token is deleted and a new
//! pair is issued, so every refresh token is single-use. Sign-in deletes all
//! prior refresh records first, enforcing one active session per account.
//!
//! ## Store Layout
//!
//! Accounts and refresh records share one key-prefixed table; refresh
//! records are found either by owner (`REFRESH_TOKEN#<owner>`) or through
//! the token-value index when only the token string is known.

pub(crate) mod admin;
mod config;
pub(crate) mod entity;
pub(crate) mod error;
mod password;
mod service;
mod store;
mod token;
pub(crate) mod types;
pub(crate) mod user;

pub use config::{AuthConfig, BootstrapAdmin};
pub use service::AuthService;
pub use store::{bootstrap, PgAuthStore};
pub use token::TokenIssuer;

use axum::{
    routing::{get, post},
    Router,
};

/// All auth routes, user and admin.
#[must_use]
pub fn routes() -> Router {
    Router::new()
        .route("/auth/sign-up", post(user::sign_up))
        .route("/auth/sign-in", post(user::sign_in))
        .route("/auth/sign-out", post(user::sign_out))
        .route("/auth/refresh-token", post(user::refresh_token))
        .route("/users/me", get(user::me))
        .route("/admin/auth/sign-in", post(admin::sign_in))
        .route("/admin/auth/sign-out", post(admin::sign_out))
        .route("/admin/auth/refresh-token", post(admin::refresh_token))
        .route("/admin/auth/create", post(admin::create))
        .route("/admin/users", get(admin::users))
}

#[cfg(test)]
mod tests;
