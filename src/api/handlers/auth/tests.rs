//! Orchestrator tests against in-memory stores.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::config::AuthConfig;
use super::entity::{Admin, AdminRole, RefreshTokenRecord, User};
use super::error::{AuthError, PrincipalKind};
use super::service::AuthService;
use super::store::{CredentialStore, TokenStore};
use super::token::{TokenError, TokenIssuer};

#[derive(Default)]
struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    admins: Mutex<HashMap<String, Admin>>,
    tokens: Mutex<Vec<RefreshTokenRecord>>,
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(phone).cloned())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.user_id == user_id)
            .cloned())
    }

    async fn user_exists(&self, phone: &str) -> Result<bool> {
        Ok(self.users.lock().await.contains_key(phone))
    }

    async fn save_user(&self, user: User) -> Result<User> {
        self.users
            .lock()
            .await
            .insert(user.phone.clone(), user.clone());
        Ok(user)
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.lock().await.values().cloned().collect();
        users.sort_by(|a, b| a.phone.cmp(&b.phone));
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.users.lock().await.len() as i64)
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        Ok(self.admins.lock().await.get(username).cloned())
    }

    async fn admin_exists(&self, username: &str) -> Result<bool> {
        Ok(self.admins.lock().await.contains_key(username))
    }

    async fn save_admin(&self, admin: Admin) -> Result<Admin> {
        self.admins
            .lock()
            .await
            .insert(admin.username.clone(), admin.clone());
        Ok(admin)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn save(&self, record: RefreshTokenRecord) -> Result<()> {
        self.tokens.lock().await.push(record);
        Ok(())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<RefreshTokenRecord>> {
        Ok(self
            .tokens
            .lock()
            .await
            .iter()
            .filter(|record| record.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn delete_all_by_owner(&self, owner_id: &str) -> Result<()> {
        self.tokens
            .lock()
            .await
            .retain(|record| record.owner_id != owner_id);
        Ok(())
    }

    async fn find_by_token_value(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .tokens
            .lock()
            .await
            .iter()
            .find(|record| record.token == token)
            .cloned())
    }

    async fn delete(&self, record: &RefreshTokenRecord) -> Result<()> {
        self.tokens
            .lock()
            .await
            .retain(|kept| !(kept.owner_id == record.owner_id && kept.token == record.token));
        Ok(())
    }

    async fn delete_by_token_value(&self, token: &str) -> Result<()> {
        self.tokens.lock().await.retain(|record| record.token != token);
        Ok(())
    }
}

fn test_config() -> AuthConfig {
    AuthConfig::new(SecretString::from(
        "0123456789abcdef0123456789abcdef".to_string(),
    ))
}

fn service_with(config: AuthConfig) -> (Arc<MemoryStore>, AuthService) {
    let store = Arc::new(MemoryStore::default());
    let issuer = TokenIssuer::new(&config);
    let service = AuthService::new(store.clone(), store.clone(), issuer);
    (store, service)
}

fn service() -> (Arc<MemoryStore>, AuthService) {
    service_with(test_config())
}

const PHONE: &str = "+821000000000";
const PASSWORD: &str = "Abcd1234!";

#[tokio::test]
async fn sign_up_succeeds_once_then_conflicts() {
    let (_store, service) = service();

    let (user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();
    assert_eq!(user.phone, PHONE);
    assert!(!pair.access_token.is_empty());
    assert!(!pair.refresh_token.is_empty());

    let err = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::DuplicateAccount(PrincipalKind::User)
    ));
}

#[tokio::test]
async fn sign_up_persists_exactly_one_refresh_record() {
    let (store, service) = service();

    let (user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let records = store.find_by_owner(&user.user_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].token, pair.refresh_token);
    assert!(records[0].expires_at > records[0].created_at);
}

#[tokio::test]
async fn sign_up_does_not_store_plaintext_password() {
    let (store, service) = service();

    service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let user = store.find_user_by_phone(PHONE).await.unwrap().unwrap();
    assert!(!user.password_hash.contains(PASSWORD));
}

#[tokio::test]
async fn sign_in_rejects_unknown_phone_and_wrong_password() {
    let (_store, service) = service();
    service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let err = service.sign_in("+821099999999", PASSWORD).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::AccountNotFound(PrincipalKind::User)
    ));

    let err = service.sign_in(PHONE, "Wrong1234!").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn second_sign_in_invalidates_first_session() {
    let (_store, service) = service();
    let (_user, first) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let (_user, second) = service.sign_in(PHONE, PASSWORD).await.unwrap();

    // The first session's refresh token was deleted by the new sign-in.
    let err = service.refresh(&first.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));

    // The new session still works.
    service.refresh(&second.refresh_token).await.unwrap();
}

#[tokio::test]
async fn refresh_rotates_and_old_token_is_single_use() {
    let (store, service) = service();
    let (user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let (_user, rotated) = service.refresh(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    // Replaying the consumed token fails.
    let err = service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));

    // Exactly one live record remains, the rotated one.
    let records = store.find_by_owner(&user.user_id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].token, rotated.refresh_token);
}

#[tokio::test]
async fn refresh_with_garbage_token_is_invalid() {
    let (_store, service) = service();
    let err = service.refresh("not-a-jwt").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::InvalidToken(TokenError::Malformed)
    ));
}

#[tokio::test]
async fn refresh_with_zero_ttl_token_is_expired() {
    let (_store, service) = service_with(test_config().with_refresh_token_ttl_days(0));
    let (_user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let err = service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(TokenError::Expired)));
}

#[tokio::test]
async fn refresh_fails_when_account_is_gone() {
    let (store, service) = service();
    let (_user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    store.users.lock().await.remove(PHONE);

    let err = service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::AccountNotFound(PrincipalKind::User)
    ));
}

#[tokio::test]
async fn sign_out_by_access_token_deletes_all_sessions() {
    let (store, service) = service();
    let (user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    service
        .sign_out_by_access_token(&format!("Bearer {}", pair.access_token))
        .await
        .unwrap();

    let records = store.find_by_owner(&user.user_id).await.unwrap();
    assert!(records.is_empty());

    // Second sign-out deletes nothing and still succeeds.
    service
        .sign_out_by_access_token(&format!("Bearer {}", pair.access_token))
        .await
        .unwrap();
}

#[tokio::test]
async fn sign_out_by_refresh_token_is_idempotent() {
    let (_store, service) = service();
    let (_user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    service
        .sign_out_by_refresh_token(&pair.refresh_token)
        .await
        .unwrap();
    service
        .sign_out_by_refresh_token(&pair.refresh_token)
        .await
        .unwrap();

    let err = service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));
}

#[tokio::test]
async fn sign_out_with_undecodable_token_is_a_noop() {
    let (_store, service) = service();
    service
        .sign_out_by_access_token("Bearer garbage")
        .await
        .unwrap();
}

#[tokio::test]
async fn sign_out_accepts_uppercase_bearer_scheme() {
    let (store, service) = service();
    let (user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    service
        .sign_out_by_access_token(&format!("BEARER {}", pair.access_token))
        .await
        .unwrap();

    let records = store.find_by_owner(&user.user_id).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn current_user_resolves_bearer_subject() {
    let (_store, service) = service();
    let (signed_up, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let user = service
        .current_user(&format!("Bearer {}", pair.access_token))
        .await
        .unwrap();
    assert_eq!(user.user_id, signed_up.user_id);
    assert_eq!(user.phone, PHONE);
}

#[tokio::test]
async fn current_user_rejects_bad_or_stale_tokens() {
    let (store, service) = service();
    let (_user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let err = service.current_user("Bearer garbage").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(_)));

    // Token still verifies but the account is gone.
    store.users.lock().await.remove(PHONE);
    let err = service.current_user(&pair.access_token).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::AccountNotFound(PrincipalKind::User)
    ));
}

#[tokio::test]
async fn admin_find_user_by_phone_or_id() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();
    let (_admin, pair) = service.admin_sign_in("root", PASSWORD).await.unwrap();
    let (user, _pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    let by_phone = service
        .admin_find_user(&pair.access_token, Some(PHONE), None)
        .await
        .unwrap();
    assert_eq!(by_phone.user_id, user.user_id);

    let by_id = service
        .admin_find_user(&pair.access_token, None, Some(&user.user_id))
        .await
        .unwrap();
    assert_eq!(by_id.phone, PHONE);

    let err = service
        .admin_find_user(&pair.access_token, Some("+820000000000"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::AccountNotFound(PrincipalKind::User)
    ));
}

#[tokio::test]
async fn admin_user_lookup_requires_an_admin_token() {
    let (_store, service) = service();
    let (_user, pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();

    // A user access token carries no role claim.
    let err = service
        .admin_find_user(&pair.access_token, Some(PHONE), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    let err = service
        .admin_list_users(&pair.access_token, 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));
}

#[tokio::test]
async fn admin_list_users_pages_and_counts() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();
    let (_admin, pair) = service.admin_sign_in("root", PASSWORD).await.unwrap();

    for digit in 0..5 {
        let phone = format!("+8210000000{digit:02}");
        service.sign_up(&phone, PASSWORD, "Kim").await.unwrap();
    }

    let (total, first_page) = service.admin_list_users(&pair.access_token, 0, 2).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(first_page.len(), 2);

    let (_total, last_page) = service.admin_list_users(&pair.access_token, 2, 2).await.unwrap();
    assert_eq!(last_page.len(), 1);

    // Pages are disjoint and ordered.
    let (_total, second_page) = service.admin_list_users(&pair.access_token, 1, 2).await.unwrap();
    assert!(first_page
        .iter()
        .all(|user| second_page.iter().all(|other| other.phone != user.phone)));
}

#[tokio::test]
async fn ensure_super_admin_is_idempotent() {
    let (store, service) = service();

    service.ensure_super_admin("root", PASSWORD).await.unwrap();
    let created = store.find_admin_by_username("root").await.unwrap().unwrap();
    assert_eq!(created.role, AdminRole::SuperAdmin);

    service.ensure_super_admin("root", "Other1234!").await.unwrap();
    let unchanged = store.find_admin_by_username("root").await.unwrap().unwrap();
    assert_eq!(unchanged.admin_id, created.admin_id);
}

#[tokio::test]
async fn admin_sign_in_and_rotation() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();

    let (admin, pair) = service.admin_sign_in("root", PASSWORD).await.unwrap();
    assert_eq!(admin.username, "root");

    let (_admin, rotated) = service.admin_refresh(&pair.refresh_token).await.unwrap();
    let err = service.admin_refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));

    service.admin_refresh(&rotated.refresh_token).await.unwrap();
}

#[tokio::test]
async fn admin_sign_in_rejects_bad_credentials() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();

    let err = service.admin_sign_in("nobody", PASSWORD).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::AccountNotFound(PrincipalKind::Admin)
    ));

    let err = service.admin_sign_in("root", "Wrong1234!").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn create_admin_requires_super_admin_role() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();
    let (_root, root_pair) = service.admin_sign_in("root", PASSWORD).await.unwrap();

    // Super-admin can create; the new admin gets the plain role.
    let created = service
        .create_admin(&root_pair.access_token, "ops", PASSWORD, "Ops")
        .await
        .unwrap();
    assert_eq!(created.role, AdminRole::Admin);

    // A plain admin cannot create further admins.
    let (_ops, ops_pair) = service.admin_sign_in("ops", PASSWORD).await.unwrap();
    let err = service
        .create_admin(&ops_pair.access_token, "intern", PASSWORD, "Intern")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    // A user access token has no role claim at all.
    let (_user, user_pair) = service.sign_up(PHONE, PASSWORD, "Kim").await.unwrap();
    let err = service
        .create_admin(&user_pair.access_token, "intern", PASSWORD, "Intern")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));
}

#[tokio::test]
async fn create_admin_rejects_duplicates_and_bad_tokens() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();
    let (_root, pair) = service.admin_sign_in("root", PASSWORD).await.unwrap();

    service
        .create_admin(&pair.access_token, "ops", PASSWORD, "Ops")
        .await
        .unwrap();
    let err = service
        .create_admin(&pair.access_token, "ops", PASSWORD, "Ops")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::DuplicateAccount(PrincipalKind::Admin)
    ));

    let err = service
        .create_admin("Bearer garbage", "intern", PASSWORD, "Intern")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken(_)));
}

#[tokio::test]
async fn admin_sign_in_invalidates_prior_admin_session() {
    let (_store, service) = service();
    service.ensure_super_admin("root", PASSWORD).await.unwrap();

    let (_admin, first) = service.admin_sign_in("root", PASSWORD).await.unwrap();
    let (_admin, second) = service.admin_sign_in("root", PASSWORD).await.unwrap();

    let err = service.admin_refresh(&first.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFound));
    service.admin_refresh(&second.refresh_token).await.unwrap();
}
