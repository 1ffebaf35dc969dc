//! Auth orchestrator: composes the credential store, token store, and token
//! issuer into sign-up, sign-in, sign-out, and refresh operations.
//!
//! This module owns every create/rotate/delete decision for refresh records.
//! Both non-transactional sequences are ordered to fail safe: deletes come
//! before saves, so a crash mid-sequence leaves an account with at most one
//! valid session, never two.

use anyhow::anyhow;
use std::sync::Arc;
use tracing::{info, warn};

use super::entity::{now_epoch_seconds, Admin, AdminRole, RefreshTokenRecord, User};
use super::error::{AuthError, FieldError, PrincipalKind};
use super::password::{hash_password, verify_password};
use super::store::{CredentialStore, TokenStore};
use super::token::TokenIssuer;

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenStore>,
    issuer: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            credentials,
            tokens,
            issuer,
        }
    }

    /// Register a new user and issue an initial token pair.
    pub async fn sign_up(
        &self,
        phone: &str,
        password: &str,
        name: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        if self.credentials.user_exists(phone).await? {
            return Err(AuthError::DuplicateAccount(PrincipalKind::User));
        }

        let user = User::new(
            phone.to_string(),
            hash_password(password)?,
            name.to_string(),
        );
        let user = self.credentials.save_user(user).await?;

        let pair = self.issue_user_pair(&user).await?;
        info!(user_id = %user.user_id, "user signed up");
        Ok((user, pair))
    }

    /// Authenticate a user. All prior refresh tokens are invalidated before
    /// the new pair is issued: one active session per user.
    pub async fn sign_in(&self, phone: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let user = self
            .credentials
            .find_user_by_phone(phone)
            .await?
            .ok_or(AuthError::AccountNotFound(PrincipalKind::User))?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        self.tokens.delete_all_by_owner(&user.user_id).await?;

        let pair = self.issue_user_pair(&user).await?;
        info!(user_id = %user.user_id, "user signed in");
        Ok((user, pair))
    }

    /// Sign out by access token: delete every refresh record for the owner.
    ///
    /// Best effort: an undecodable token or unknown account is logged and
    /// treated as a no-op, sign-out never fails visibly to the caller.
    pub async fn sign_out_by_access_token(&self, bearer: &str) -> Result<(), AuthError> {
        let token = strip_bearer(bearer);

        let claims = match self.issuer.decode(token) {
            Ok(claims) => claims,
            Err(err) => {
                warn!("sign-out with undecodable token: {err}");
                return Ok(());
            }
        };

        if let Some(user) = self.credentials.find_user_by_phone(&claims.sub).await? {
            self.tokens.delete_all_by_owner(&user.user_id).await?;
        }

        Ok(())
    }

    /// Sign out a single session by its refresh token value. Idempotent.
    pub async fn sign_out_by_refresh_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.tokens.delete_by_token_value(refresh_token).await?;
        Ok(())
    }

    /// Rotate-on-use refresh: each token is single-use, presenting it again
    /// after rotation fails with `TokenNotFound`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
        let claims = self.issuer.decode(refresh_token)?;

        let record = self
            .tokens
            .find_by_token_value(refresh_token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let user = self
            .credentials
            .find_user_by_phone(&claims.sub)
            .await?
            .ok_or(AuthError::AccountNotFound(PrincipalKind::User))?;

        // Delete before save: a crash here forces re-login, never two live
        // sessions.
        self.tokens.delete(&record).await?;

        let pair = self.issue_user_pair(&user).await?;
        Ok((user, pair))
    }

    /// Account behind a bearer access token. The subject is the phone
    /// number, so admin tokens resolve to no user here.
    pub async fn current_user(&self, bearer: &str) -> Result<User, AuthError> {
        let claims = self.issuer.decode(strip_bearer(bearer))?;
        self.credentials
            .find_user_by_phone(&claims.sub)
            .await?
            .ok_or(AuthError::AccountNotFound(PrincipalKind::User))
    }

    async fn issue_user_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = self.issuer.user_access_token(&user.phone)?;
        let refresh_token = self.issuer.user_refresh_token(&user.phone)?;
        self.persist_refresh(&user.user_id, &refresh_token).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Authenticate an administrator by username.
    pub async fn admin_sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Admin, TokenPair), AuthError> {
        let admin = self
            .credentials
            .find_admin_by_username(username)
            .await?
            .ok_or(AuthError::AccountNotFound(PrincipalKind::Admin))?;

        if !verify_password(password, &admin.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        self.tokens.delete_all_by_owner(&admin.admin_id).await?;

        let pair = self.issue_admin_pair(&admin).await?;
        info!(admin_id = %admin.admin_id, "admin signed in");
        Ok((admin, pair))
    }

    /// Admin variant of sign-out by access token. The subject is the admin
    /// id, which is also the refresh-record owner key.
    pub async fn admin_sign_out_by_access_token(&self, bearer: &str) -> Result<(), AuthError> {
        let token = strip_bearer(bearer);

        match self.issuer.decode(token) {
            Ok(claims) => {
                self.tokens.delete_all_by_owner(&claims.sub).await?;
            }
            Err(err) => {
                warn!("admin sign-out with undecodable token: {err}");
            }
        }

        Ok(())
    }

    /// Rotate an admin refresh token. The subject is the username, so the
    /// account resolves through the username-keyed credential store.
    pub async fn admin_refresh(&self, refresh_token: &str) -> Result<(Admin, TokenPair), AuthError> {
        let claims = self.issuer.decode(refresh_token)?;

        let record = self
            .tokens
            .find_by_token_value(refresh_token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let admin = self
            .credentials
            .find_admin_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::AccountNotFound(PrincipalKind::Admin))?;

        self.tokens.delete(&record).await?;

        let pair = self.issue_admin_pair(&admin).await?;
        Ok((admin, pair))
    }

    /// Create a new administrator. Requires a bearer access token carrying
    /// the super-admin role.
    pub async fn create_admin(
        &self,
        bearer: &str,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<Admin, AuthError> {
        let claims = self.issuer.decode(strip_bearer(bearer))?;
        if claims.role != Some(AdminRole::SuperAdmin) {
            return Err(AuthError::Forbidden);
        }

        if self.credentials.admin_exists(username).await? {
            return Err(AuthError::DuplicateAccount(PrincipalKind::Admin));
        }

        let admin = Admin::new(
            username.to_string(),
            hash_password(password)?,
            name.to_string(),
            AdminRole::Admin,
        );
        let admin = self.credentials.save_admin(admin).await?;
        info!(admin_id = %admin.admin_id, created_by = %claims.sub, "admin created");
        Ok(admin)
    }

    /// Look up a single user by phone number or user id. Requires a bearer
    /// access token carrying any admin role.
    pub async fn admin_find_user(
        &self,
        bearer: &str,
        phone: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<User, AuthError> {
        self.require_admin(bearer)?;

        let user = match (phone, user_id) {
            (Some(phone), _) => self.credentials.find_user_by_phone(phone).await?,
            (None, Some(user_id)) => self.credentials.find_user_by_id(user_id).await?,
            (None, None) => {
                return Err(AuthError::Validation(vec![FieldError {
                    field: "phone".to_string(),
                    message: "phone or userId is required".to_string(),
                }]))
            }
        };

        user.ok_or(AuthError::AccountNotFound(PrincipalKind::User))
    }

    /// Page through all users, returning the page plus the total count.
    pub async fn admin_list_users(
        &self,
        bearer: &str,
        page: i64,
        size: i64,
    ) -> Result<(i64, Vec<User>), AuthError> {
        self.require_admin(bearer)?;

        let size = size.clamp(1, 100);
        let page = page.max(0);
        let users = self.credentials.list_users(page * size, size).await?;
        let total = self.credentials.count_users().await?;
        Ok((total, users))
    }

    fn require_admin(&self, bearer: &str) -> Result<(), AuthError> {
        let claims = self.issuer.decode(strip_bearer(bearer))?;
        if claims.role.is_none() {
            return Err(AuthError::Forbidden);
        }
        Ok(())
    }

    /// Create the configured super-admin at startup if it does not exist.
    pub async fn ensure_super_admin(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.credentials.admin_exists(username).await? {
            return Ok(());
        }

        let admin = Admin::new(
            username.to_string(),
            hash_password(password)?,
            username.to_string(),
            AdminRole::SuperAdmin,
        );
        let admin = self.credentials.save_admin(admin).await?;
        info!(admin_id = %admin.admin_id, "bootstrap super-admin created");
        Ok(())
    }

    async fn issue_admin_pair(&self, admin: &Admin) -> Result<TokenPair, AuthError> {
        let access_token =
            self.issuer
                .admin_access_token(&admin.admin_id, &admin.username, admin.role)?;
        let refresh_token = self.issuer.admin_refresh_token(&admin.username)?;
        self.persist_refresh(&admin.admin_id, &refresh_token).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn persist_refresh(&self, owner_id: &str, token: &str) -> Result<(), AuthError> {
        // The token was minted just above, so a decode failure here is a bug.
        let expires_at = self
            .issuer
            .expiry_of(token)
            .map_err(|err| anyhow!("freshly issued token failed to decode: {err}"))?;

        self.tokens
            .save(RefreshTokenRecord {
                owner_id: owner_id.to_string(),
                token: token.to_string(),
                created_at: now_epoch_seconds(),
                expires_at,
            })
            .await?;
        Ok(())
    }
}

fn strip_bearer(value: &str) -> &str {
    // The auth scheme is case-insensitive per RFC 7235.
    let trimmed = value.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => trimmed[7..].trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::strip_bearer;

    #[test]
    fn strip_bearer_handles_prefix_and_bare_token() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("bearer abc"), "abc");
        assert_eq!(strip_bearer("BEARER abc"), "abc");
        assert_eq!(strip_bearer("BeArEr abc"), "abc");
        assert_eq!(strip_bearer("  Bearer abc  "), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
        assert_eq!(strip_bearer("Bear"), "Bear");
    }
}
