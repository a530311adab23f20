// CMS handlers: admin session and user management

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::{CookieJar, WithRejection};
use serde::Serialize;
use tracing::{info, warn};

use super::{JsonBody, MultipartBody, PathParam};
use crate::{
    app::AppState,
    auth::{admin_cookie, expired_admin_cookie, AdminSession, Role},
    error::{ApiError, ApiResult},
    models::{Admin, ApiResponse, CreateAdminRequest, Empty, LoginRequest, NewUserForm, Rows, User},
    storage::random_object_name,
    upload::UploadForm,
};

#[derive(Debug, Serialize)]
pub struct AdminId {
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct UserCount {
    pub count: i64,
}

/// GET /home
pub async fn home(AdminSession(admin): AdminSession) -> ApiResponse<AdminId> {
    ApiResponse::success("Welcome", AdminId { id: admin.id })
}

/// GET /countUser
pub async fn count_user(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<ApiResponse<UserCount>> {
    let count = state.db.count_users().await?;
    Ok(ApiResponse::success("Success count user", UserCount { count }))
}

/// POST /addadmin
///
/// Open while the admins table is empty so the first operator can be created;
/// afterwards an admin session is required.
pub async fn add_admin(
    State(state): State<AppState>,
    session: Option<AdminSession>,
    WithRejection(Json(request), _): JsonBody<CreateAdminRequest>,
) -> ApiResult<ApiResponse<Rows<Admin>>> {
    // Cheap early exit; the insert below re-checks atomically
    if session.is_none() && state.db.count_admins().await? > 0 {
        return Err(ApiError::unauthorized("Unauthorized"));
    }

    request.validate_new().map_err(ApiError::Validation)?;

    let email = request.normalized_admin_email();
    let password_hash = state.passwords.hash(&request.password).await?;

    let admin = match session {
        Some(AdminSession(by)) => {
            let admin = state.db.create_admin(&email, &password_hash).await?;
            info!("Admin {} created admin {}", by.id, admin.id);
            admin
        }
        None => {
            let admin = state
                .db
                .create_first_admin(&email, &password_hash)
                .await?
                .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
            warn!("Bootstrapped first admin account {}", admin.id);
            admin
        }
    };

    Ok(ApiResponse::rows("Success add admin", admin))
}

/// POST /loginAdmin
pub async fn login_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): JsonBody<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<Empty>)> {
    request.validate().map_err(ApiError::Validation)?;

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let admin = state
        .db
        .find_admin_by_email(&request.normalized_email())
        .await?
        .ok_or_else(invalid)?;

    if !state.passwords.verify(&request.password, &admin.password).await? {
        return Err(invalid());
    }

    let token = state.tokens.issue(admin.id, &admin.email, Role::Admin)?;
    let jar = jar.add(admin_cookie(token, state.secure_cookies));

    info!("Admin {} logged in", admin.id);
    Ok((jar, ApiResponse::message("login success")))
}

/// DELETE /logoutAdmin
pub async fn logout_admin(jar: CookieJar) -> (CookieJar, ApiResponse<Empty>) {
    (jar.remove(expired_admin_cookie()), ApiResponse::message("logout success"))
}

/// GET /listadmin
pub async fn list_admins(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<ApiResponse<Rows<Vec<Admin>>>> {
    let admins = state.db.get_all_admins().await?;
    Ok(ApiResponse::rows("Success get all admin", admins))
}

/// DELETE /deleteAdmin/:id
pub async fn delete_admin(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Empty>> {
    state.db.delete_admin(id).await?;

    info!("Admin {} deleted admin {}", admin.id, id);
    Ok(ApiResponse::message("Success delete admin"))
}

/// GET /listuser
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<ApiResponse<Rows<Vec<User>>>> {
    let users = state.db.get_all_users().await?;
    Ok(ApiResponse::rows("Success get all user", users))
}

/// POST /addUser
///
/// Multipart form `name`, `email`, `password` and the profile picture `file`.
/// The email is checked before anything is uploaded.
pub async fn add_user(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    WithRejection(multipart, _): MultipartBody,
) -> ApiResult<ApiResponse<Rows<User>>> {
    let mut form = UploadForm::read(multipart).await?;

    let fields = NewUserForm {
        name: form.require_text("name")?,
        email: form.require_text("email")?,
        password: form.require_text("password")?,
    };
    fields.validate().map_err(ApiError::Validation)?;

    let email = fields.normalized_email();
    if state.db.user_email_exists(&email).await? {
        return Err(ApiError::conflict("Email already exists"));
    }

    let file = form
        .take_file("file")
        .ok_or_else(|| ApiError::validation("No file upload"))?;

    let content_type = file.content_type_or_default().to_string();
    let image_url = state
        .storage
        .upload(&random_object_name("-"), &content_type, file.bytes)
        .await?;

    let password_hash = state.passwords.hash(&fields.password).await?;
    let user = state
        .db
        .create_user(fields.name.trim(), &email, &password_hash, Some(&image_url))
        .await?;

    info!("Admin {} added user {}", admin.id, user.id);
    Ok(ApiResponse::rows("Success add user", user))
}

/// DELETE /deleteUser/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Empty>> {
    state.db.delete_user(id).await?;

    info!("Admin {} deleted user {}", admin.id, id);
    Ok(ApiResponse::message("Success delete user"))
}
