//! Token and server configuration, loaded once at startup.

use secrecy::SecretString;

const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: u64 = 30;
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: u64 = 14;
const DEFAULT_ISSUER: &str = "sesame";
const DEFAULT_USER_AUDIENCE: &str = "sesame:user";
const DEFAULT_ADMIN_AUDIENCE: &str = "sesame:admin";

/// Super-admin account created at startup if missing.
#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: SecretString,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret: SecretString,
    issuer: String,
    user_audience: String,
    admin_audience: String,
    access_token_ttl_minutes: u64,
    refresh_token_ttl_days: u64,
    allowed_origin: Option<String>,
    bootstrap_admin: Option<BootstrapAdmin>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            issuer: DEFAULT_ISSUER.to_string(),
            user_audience: DEFAULT_USER_AUDIENCE.to_string(),
            admin_audience: DEFAULT_ADMIN_AUDIENCE.to_string(),
            access_token_ttl_minutes: DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            refresh_token_ttl_days: DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            allowed_origin: None,
            bootstrap_admin: None,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_user_audience(mut self, audience: String) -> Self {
        self.user_audience = audience;
        self
    }

    #[must_use]
    pub fn with_admin_audience(mut self, audience: String) -> Self {
        self.admin_audience = audience;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_minutes(mut self, minutes: u64) -> Self {
        self.access_token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_days(mut self, days: u64) -> Self {
        self.refresh_token_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_allowed_origin(mut self, origin: String) -> Self {
        self.allowed_origin = Some(origin);
        self
    }

    #[must_use]
    pub fn with_bootstrap_admin(mut self, admin: BootstrapAdmin) -> Self {
        self.bootstrap_admin = Some(admin);
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn user_audience(&self) -> &str {
        &self.user_audience
    }

    #[must_use]
    pub fn admin_audience(&self) -> &str {
        &self.admin_audience
    }

    #[must_use]
    pub fn access_token_ttl_minutes(&self) -> u64 {
        self.access_token_ttl_minutes
    }

    #[must_use]
    pub fn refresh_token_ttl_days(&self) -> u64 {
        self.refresh_token_ttl_days
    }

    #[must_use]
    pub fn allowed_origin(&self) -> Option<&str> {
        self.allowed_origin.as_deref()
    }

    #[must_use]
    pub fn bootstrap_admin(&self) -> Option<&BootstrapAdmin> {
        self.bootstrap_admin.as_ref()
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }
}
