// Mobile account handlers: registration, login and profile

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use tracing::info;

use super::{ensure_account_exists, JsonBody, MultipartBody, PathParam};
use crate::{
    app::AppState,
    auth::{AuthUser, Role},
    error::{ApiError, ApiResult},
    models::{ApiResponse, LoginRequest, RegisterRequest, Rows, UpdateNameRequest, User},
    storage::random_object_name,
    upload::UploadForm,
};

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    #[serde(rename = "tokenId")]
    pub token_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginPayload {
    #[serde(rename = "tokenId")]
    pub token_id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NamePayload {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ImagePayload {
    pub image: String,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(request), _): JsonBody<RegisterRequest>,
) -> ApiResult<ApiResponse<IssuedToken>> {
    request.validate().map_err(ApiError::Validation)?;

    let email = request.normalized_email();
    info!("Registering user with email: {}", email);

    if state.db.user_email_exists(&email).await? {
        return Err(ApiError::conflict("Email already exists"));
    }

    let password_hash = state.passwords.hash(&request.password).await?;
    let user = state.db.create_user(request.name.trim(), &email, &password_hash, None).await?;

    let token = state.tokens.issue(user.id, &user.email, Role::User)?;
    state.db.store_user_token(user.id, &token).await?;

    Ok(ApiResponse::success("Registration successful", IssuedToken { token_id: token }))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): JsonBody<LoginRequest>,
) -> ApiResult<ApiResponse<LoginPayload>> {
    request.validate().map_err(ApiError::Validation)?;

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .db
        .find_user_by_email(&request.normalized_email())
        .await?
        .ok_or_else(invalid)?;

    if !state.passwords.verify(&request.password, &user.password).await? {
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id, &user.email, Role::User)?;
    state.db.store_user_token(user.id, &token).await?;

    info!("User {} logged in", user.id);
    Ok(ApiResponse::success("Login Success", LoginPayload {
        token_id: token,
        name: user.name,
        email: user.email,
        image: user.image_url,
    }))
}

/// GET /user/:id
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Rows<User>>> {
    let user = state.db.get_user_by_id(id).await?;
    Ok(ApiResponse::rows("Success get user", user))
}

/// PUT /insertName/:id
pub async fn insert_name(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): PathParam<i32>,
    WithRejection(Json(request), _): JsonBody<UpdateNameRequest>,
) -> ApiResult<ApiResponse<NamePayload>> {
    ensure_own_profile(claims.id, id)?;
    request.validate().map_err(ApiError::Validation)?;

    let user = state.db.update_user_name(id, &request.normalized_name()).await?;

    Ok(ApiResponse::success("success input name", NamePayload { name: user.name }))
}

/// PUT /uploadImage/:id, multipart field `file`
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): PathParam<i32>,
    WithRejection(multipart, _): MultipartBody,
) -> ApiResult<ApiResponse<ImagePayload>> {
    ensure_own_profile(claims.id, id)?;
    ensure_account_exists(&state, &claims).await?;

    let mut form = UploadForm::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| ApiError::validation("No file upload"))?;

    let object_name = random_object_name("-");
    let content_type = file.content_type_or_default().to_string();
    let url = state
        .storage
        .upload(&object_name, &content_type, file.bytes)
        .await?;

    let user = state.db.update_user_image(id, &url).await?;
    let image = user.image_url.unwrap_or(url);

    Ok(ApiResponse::success("Success upload image", ImagePayload { image }))
}

fn ensure_own_profile(token_user: i32, path_user: i32) -> ApiResult<()> {
    if token_user != path_user {
        return Err(ApiError::Forbidden("Cannot modify another user's profile".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_own_profile() {
        assert!(ensure_own_profile(3, 3).is_ok());
        assert!(matches!(ensure_own_profile(3, 4), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_login_payload_keys() {
        let payload = LoginPayload {
            token_id: "jwt".to_string(),
            name: "Budi".to_string(),
            email: "budi@example.com".to_string(),
            image: None,
        };

        let json = serde_json::to_value(ApiResponse::success("Login Success", payload)).unwrap();
        assert_eq!(json["tokenId"], "jwt");
        assert_eq!(json["image"], serde_json::Value::Null);
        assert_eq!(json["status"], "Success");
    }
}
