//! End-user auth endpoints.

use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::error::{AuthError, ErrorResponse};
use super::service::AuthService;
use super::types::{
    MessageResponse, RefreshTokenRequest, SignInRequest, SignInResponse, SignOutRequest,
    SignUpRequest, TokenPairResponse, UserResponse,
};

#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created, initial token pair issued", body = SignInResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Phone number already registered", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_up(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<SignUpRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::missing_body().into_response();
    };

    if let Err(err) = request.validate() {
        return err.into_response();
    }

    match service
        .sign_up(&request.phone, &request.password, &request.name)
        .await
    {
        Ok((user, pair)) => (
            StatusCode::CREATED,
            Json(SignInResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                phone: user.phone,
                name: user.name,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Authenticated, prior sessions invalidated", body = SignInResponse),
        (status = 401, description = "Password mismatch", body = ErrorResponse),
        (status = 404, description = "No account for this phone number", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<SignInRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::missing_body().into_response();
    };

    if let Err(err) = request.validate() {
        return err.into_response();
    }

    match service.sign_in(&request.phone, &request.password).await {
        Ok((user, pair)) => (
            StatusCode::OK,
            Json(SignInResponse {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                phone: user.phone,
                name: user.name,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/sign-out",
    request_body = SignOutRequest,
    responses(
        (status = 200, description = "Signed out; idempotent", body = MessageResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn sign_out(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    payload: Option<Json<SignOutRequest>>,
) -> impl IntoResponse {
    // Sign-out never fails visibly. Failures are logged and the caller
    // still gets a 200.
    let result = if let Some(bearer) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        service.sign_out_by_access_token(bearer).await
    } else if let Some(token) = payload.and_then(|Json(body)| body.refresh_token) {
        service.sign_out_by_refresh_token(&token).await
    } else {
        Ok(())
    };

    if let Err(err) = result {
        error!("sign-out failed: {err}");
    }

    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "signed out".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Account behind the bearer access token", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn me(service: Extension<Arc<AuthService>>, headers: HeaderMap) -> impl IntoResponse {
    let Some(bearer) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return AuthError::InvalidToken(super::token::TokenError::Malformed).into_response();
    };

    match service.current_user(bearer).await {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenPairResponse),
        (status = 401, description = "Signature invalid or token expired", body = ErrorResponse),
        (status = 404, description = "Token not in store: replayed or already rotated", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthError::missing_body().into_response();
    };

    match service.refresh(&request.refresh_token).await {
        Ok((_user, pair)) => (
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
