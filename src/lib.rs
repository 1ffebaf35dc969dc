//! # Sesame (Phone-number Authentication & Token Service)
//!
//! `sesame` authenticates end-users by phone number + password and
//! administrators by username + password, issuing paired JSON Web Tokens:
//! a short-lived access token and a longer-lived, server-persisted refresh
//! token.
//!
//! ## Token Rotation
//!
//! Refresh tokens are single-use. Presenting one mints a fresh token pair,
//! deletes the old store record, and persists the new one. A replayed or
//! already-rotated token is rejected with `404 TOKEN_NOT_FOUND`.
//!
//! ## Single Active Session
//!
//! Sign-in deletes every prior refresh token for the account before issuing
//! a new pair, so a new login invalidates all other sessions. The delete
//! happens first: a crash mid-sequence leaves an account with at most one
//! valid session, never two.
//!
//! ## Persistence
//!
//! Accounts and refresh tokens live in a single key-prefixed table
//! (`USER#`, `ADMIN#`, `REFRESH_TOKEN#`). Refresh tokens are additionally
//! indexed by token value so rotation can resolve the owner from the token
//! string alone, without a scan.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
