use crate::api::handlers::{
    auth::{admin, entity, error, types, user},
    health, root,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        user::sign_up,
        user::sign_in,
        user::sign_out,
        user::refresh_token,
        user::me,
        admin::sign_in,
        admin::sign_out,
        admin::refresh_token,
        admin::create,
        admin::users,
    ),
    components(schemas(
        root::Version,
        health::Health,
        entity::AdminRole,
        error::ErrorResponse,
        error::FieldError,
        types::SignUpRequest,
        types::SignInRequest,
        types::SignOutRequest,
        types::RefreshTokenRequest,
        types::AdminSignInRequest,
        types::AdminCreateRequest,
        types::SignInResponse,
        types::TokenPairResponse,
        types::AdminResponse,
        types::MessageResponse,
        types::UserResponse,
        types::UserListResponse,
    )),
    tags(
        (name = "auth", description = "Phone-number sign-up, sign-in, and token rotation"),
        (name = "admin", description = "Administrator authentication and management"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/health",
            "/auth/sign-up",
            "/auth/sign-in",
            "/auth/sign-out",
            "/auth/refresh-token",
            "/users/me",
            "/admin/auth/sign-in",
            "/admin/auth/sign-out",
            "/admin/auth/refresh-token",
            "/admin/auth/create",
            "/admin/users",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path: {path}");
        }
    }
}
