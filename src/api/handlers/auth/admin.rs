//! Administrator auth endpoints. Same token lifecycle as end-users, with a
//! role claim in access tokens and super-admin-gated account creation.

use axum::{
    extract::{Extension, Query},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::error::{AuthError, ErrorResponse};
use super::service::AuthService;
use super::types::{
    AdminCreateRequest, AdminResponse, AdminSignInRequest, MessageResponse, RefreshTokenRequest,
    SignOutRequest, TokenPairResponse, UserListResponse, UserResponse, UsersQuery,
};

const DEFAULT_PAGE_SIZE: i64 = 10;

#[utoipa::path(
    post,
    path = "/admin/auth/sign-in",
    request_body = AdminSignInRequest,
    responses(
        (status = 200, description = "Authenticated, prior sessions invalidated", body = TokenPairResponse),
        (status = 401, description = "Password mismatch", body = ErrorResponse),
        (status = 404, description = "No administrator with this username", body = ErrorResponse),
    ),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<AdminSignInRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::missing_body().into_response();
    };

    if let Err(err) = request.validate() {
        return err.into_response();
    }

    match service
        .admin_sign_in(&request.username, &request.password)
        .await
    {
        Ok((_admin, pair)) => (
            StatusCode::OK,
            Json(TokenPairResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/admin/auth/sign-out",
    request_body = SignOutRequest,
    responses(
        (status = 200, description = "Signed out; idempotent", body = MessageResponse),
    ),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn sign_out(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    payload: Option<Json<SignOutRequest>>,
) -> impl IntoResponse {
    let result = if let Some(bearer) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        service.admin_sign_out_by_access_token(bearer).await
    } else if let Some(token) = payload.and_then(|Json(body)| body.refresh_token) {
        service.sign_out_by_refresh_token(&token).await
    } else {
        Ok(())
    };

    if let Err(err) = result {
        error!("admin sign-out failed: {err}");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "signed out".to_string(),
        }),
    )
}

#[utoipa::path(
    post,
    path = "/admin/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenPairResponse),
        (status = 401, description = "Signature invalid or token expired", body = ErrorResponse),
        (status = 404, description = "Token not in store: replayed or already rotated", body = ErrorResponse),
    ),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::missing_body().into_response();
    };

    match service.admin_refresh(&request.refresh_token).await {
        Ok((_admin, pair)) => (
            StatusCode::OK,
            Json(TokenPairResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/admin/users",
    params(UsersQuery),
    responses(
        (status = 200, description = "Single user or a page of users", body = UserListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "No user matches the lookup", body = ErrorResponse),
    ),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn users(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Query(query): Query<UsersQuery>,
) -> impl IntoResponse {
    let Some(bearer) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return AuthError::InvalidToken(super::token::TokenError::Malformed).into_response();
    };

    // A phone or userId parameter turns the listing into a single lookup.
    if query.phone.is_some() || query.user_id.is_some() {
        return match service
            .admin_find_user(bearer, query.phone.as_deref(), query.user_id.as_deref())
            .await
        {
            Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
            Err(err) => err.into_response(),
        };
    }

    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE);

    match service.admin_list_users(bearer, page, size).await {
        Ok((total_count, users)) => (
            StatusCode::OK,
            Json(UserListResponse {
                page,
                size,
                total_count,
                users: users.into_iter().map(UserResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/admin/auth/create",
    request_body = AdminCreateRequest,
    responses(
        (status = 201, description = "Administrator created", body = AdminResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not a super-admin", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
    ),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn create(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    payload: Option<Json<AdminCreateRequest>>,
) -> impl IntoResponse {
    let Some(bearer) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return AuthError::InvalidToken(super::token::TokenError::Malformed).into_response();
    };

    let Some(Json(request)) = payload else {
        return AuthError::missing_body().into_response();
    };

    if let Err(err) = request.validate() {
        return err.into_response();
    }

    match service
        .create_admin(bearer, &request.username, &request.password, &request.name)
        .await
    {
        Ok(admin) => (
            StatusCode::CREATED,
            Json(AdminResponse {
                admin_id: admin.admin_id,
                username: admin.username,
                name: admin.name,
                role: admin.role,
                created_at: admin.created_at,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
