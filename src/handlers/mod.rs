// Handlers module
// HTTP handlers for the mobile app and the CMS

pub mod account;
pub mod articles;
pub mod cms;
pub mod quizzes;


use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    app::AppState,
    auth::Claims,
    error::{ApiError, ApiResult},
};

/// JSON body whose rejection is reported as an `ApiError`.
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;

/// Path parameters whose rejection is reported as an `ApiError`.
pub type PathParam<T> = WithRejection<Path<T>, ApiError>;

pub type MultipartBody = WithRejection<Multipart, ApiError>;

/// Tokens outlive deleted accounts. Handlers that upload on behalf of a
/// bearer token call this before touching storage.
pub(crate) async fn ensure_account_exists(state: &AppState, claims: &Claims) -> ApiResult<()> {
    if !state.db.user_exists(claims.id).await? {
        tracing::debug!("Token for deleted user {} rejected", claims.id);
        return Err(ApiError::unauthorized("Dont have access"));
    }
    Ok(())
}

/// Any path the router does not know
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
