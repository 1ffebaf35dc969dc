//! Token Issuer: signs and decodes access/refresh JWTs (HS256).
//!
//! Validity here is purely cryptographic (signature + expiry). Whether a
//! refresh token is still live in the store is the orchestrator's concern.

use anyhow::{Context, Result};
use base64ct::{Base64, Base64UrlUnpadded, Encoding};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::AuthConfig;
use super::entity::{now_epoch_seconds, AdminRole};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Signature invalid or structurally unparsable.
    #[error("malformed token")]
    Malformed,
    /// Signature fine, expiry in the past.
    #[error("expired token")]
    Expired,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per-token id. Keeps two tokens minted within the same second
    /// from colliding as store keys.
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    user_audience: String,
    admin_audience: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        // Accept a base64-encoded secret, falling back to raw bytes.
        let secret = config.secret().expose_secret();
        let key_bytes = Base64::decode_vec(secret).unwrap_or_else(|_| secret.as_bytes().to_vec());

        Self {
            encoding_key: EncodingKey::from_secret(&key_bytes),
            decoding_key: DecodingKey::from_secret(&key_bytes),
            issuer: config.issuer().to_string(),
            user_audience: config.user_audience().to_string(),
            admin_audience: config.admin_audience().to_string(),
            access_ttl_seconds: config.access_token_ttl_minutes() as i64 * SECONDS_PER_MINUTE,
            refresh_ttl_seconds: config.refresh_token_ttl_days() as i64 * SECONDS_PER_DAY,
        }
    }

    /// Access token for an end-user, subject is the phone number.
    pub fn user_access_token(&self, phone: &str) -> Result<String> {
        self.issue(phone, &self.user_audience, self.access_ttl_seconds, None, None)
    }

    /// Access token for an administrator, subject is the admin id with
    /// username and role claims.
    pub fn admin_access_token(&self, admin_id: &str, username: &str, role: AdminRole) -> Result<String> {
        self.issue(
            admin_id,
            &self.admin_audience,
            self.access_ttl_seconds,
            Some(username.to_string()),
            Some(role),
        )
    }

    /// Refresh token for an end-user, subject is the phone number.
    pub fn user_refresh_token(&self, phone: &str) -> Result<String> {
        self.issue(phone, &self.user_audience, self.refresh_ttl_seconds, None, None)
    }

    /// Refresh token for an administrator, subject is the username so the
    /// rotation path can resolve the account through the credential store.
    pub fn admin_refresh_token(&self, username: &str) -> Result<String> {
        self.issue(
            username,
            &self.admin_audience,
            self.refresh_ttl_seconds,
            None,
            None,
        )
    }

    fn issue(
        &self,
        subject: &str,
        audience: &str,
        ttl_seconds: i64,
        username: Option<String>,
        role: Option<AdminRole>,
    ) -> Result<String> {
        let now = now_epoch_seconds();
        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: audience.to_string(),
            iat: now,
            exp: now + ttl_seconds,
            jti: new_jti(),
            username,
            role,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("failed to sign token")
    }

    /// Signature + expiry check only, no store membership.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        self.decode(token).is_ok()
    }

    /// Decode and verify a token.
    ///
    /// Expiry is compared against wall-clock now with zero leeway: a token
    /// whose `exp` is at or before now is expired.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below without leeway; audiences differ per
        // principal kind so they are not validated here.
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.exp <= now_epoch_seconds() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// Expiry claim of a token, as epoch seconds, for persisting alongside
    /// the refresh record.
    pub fn expiry_of(&self, token: &str) -> Result<i64, TokenError> {
        Ok(self.decode(token)?.exp)
    }
}

fn new_jti() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}
