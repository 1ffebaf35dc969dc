use crate::GIT_COMMIT_HASH;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Version {
    name: String,
    version: String,
    build: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service name, version and build", body = Version)
    ),
    tag = "health"
)]
pub async fn root() -> impl IntoResponse {
    Json(Version {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: GIT_COMMIT_HASH.to_string(),
    })
}
