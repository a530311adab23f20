// Quiz handlers, shared by the spelling and pronunciation routers.
// The kind is injected per router as an `Extension<QuizKind>`.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use super::{ensure_account_exists, JsonBody, MultipartBody, PathParam};
use crate::{
    app::AppState,
    auth::{AdminSession, AuthUser},
    error::{ApiError, ApiResult},
    models::{ApiResponse, CreateQuizRequest, Empty, Grade, Quiz, QuizKind, QuizStatus, Rows, SubmissionResult},
    storage::submission_object_name,
    upload::UploadForm,
};

/// GET /{kind}/level/:level
///
/// Anonymous callers get every quiz as unanswered.
pub async fn quizzes_by_level(
    State(state): State<AppState>,
    Extension(kind): Extension<QuizKind>,
    user: Option<AuthUser>,
    WithRejection(Path(level), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Rows<Vec<QuizStatus>>>> {
    let user_id = user.map(|AuthUser(claims)| claims.id);
    let quizzes = state.db.get_quizzes_by_level(kind, level, user_id).await?;

    if quizzes.is_empty() {
        return Err(ApiError::not_found("Quiz not found"));
    }

    Ok(ApiResponse::rows(format!("Success get {} quiz", kind.label().to_lowercase()), quizzes))
}

/// GET /{kind}/:id
pub async fn quiz_by_id(
    State(state): State<AppState>,
    Extension(kind): Extension<QuizKind>,
    user: Option<AuthUser>,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Rows<QuizStatus>>> {
    let user_id = user.map(|AuthUser(claims)| claims.id);
    let quiz = state.db.get_quiz_status(kind, id, user_id).await?;

    Ok(ApiResponse::rows(format!("Success get {} quiz", kind.label().to_lowercase()), quiz))
}

/// POST /{kind}/:id, multipart field `file`
///
/// Uploads the artifact, asks the kind's grader for a verdict and appends the
/// graded attempt to the user's history. Nothing is recorded when the upload
/// or the grader fails.
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(kind): Extension<QuizKind>,
    AuthUser(claims): AuthUser,
    WithRejection(Path(id), _): PathParam<i32>,
    WithRejection(multipart, _): MultipartBody,
) -> ApiResult<ApiResponse<SubmissionResult>> {
    ensure_account_exists(&state, &claims).await?;

    let quiz = state.db.get_quiz(kind, id).await?;
    if !quiz.is_open {
        return Err(ApiError::Forbidden("Quiz is not open".to_string()));
    }

    let mut form = UploadForm::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| ApiError::validation("No file upload"))?;

    let object_name = submission_object_name(file.file_name.as_deref());
    let content_type = file.content_type_or_default().to_string();
    let file_url = state
        .storage
        .upload(&object_name, &content_type, file.bytes)
        .await?;

    let verdict = state.scoring.check(kind, &file_url, &quiz.text).await?;
    let grade = Grade::from_verdict(verdict);

    state.db.record_attempt(kind, claims.id, quiz.id, grade).await?;

    info!("User {} answered {} quiz {}: {}", claims.id, kind, quiz.id, grade);
    Ok(ApiResponse::success("Success get result", SubmissionResult {
        text: quiz.text,
        is_answered: true,
        check: grade,
        is_open: true,
    }))
}

/// GET /listSpelling, /listPronunciation
pub async fn list_quizzes(
    State(state): State<AppState>,
    Extension(kind): Extension<QuizKind>,
    _admin: AdminSession,
) -> ApiResult<ApiResponse<Rows<Vec<Quiz>>>> {
    let quizzes = state.db.get_all_quizzes(kind).await?;
    Ok(ApiResponse::rows(format!("Success get all {} quiz", kind.label().to_lowercase()), quizzes))
}

/// POST /addSpelling, /addPronunciation
pub async fn add_quiz(
    State(state): State<AppState>,
    Extension(kind): Extension<QuizKind>,
    AdminSession(admin): AdminSession,
    WithRejection(Json(request), _): JsonBody<CreateQuizRequest>,
) -> ApiResult<ApiResponse<Rows<Quiz>>> {
    request.validate().map_err(ApiError::Validation)?;

    let quiz = state.db.create_quiz(kind, &request.normalized_text(), request.level).await?;

    info!("Admin {} added {} quiz {}", admin.id, kind, quiz.id);
    Ok(ApiResponse::rows(format!("Success add {} quiz", kind.label().to_lowercase()), quiz))
}

/// DELETE /deleteSpelling/:id, /deletePronunciation/:id
pub async fn delete_quiz(
    State(state): State<AppState>,
    Extension(kind): Extension<QuizKind>,
    AdminSession(admin): AdminSession,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Empty>> {
    state.db.delete_quiz(kind, id).await?;

    info!("Admin {} deleted {} quiz {}", admin.id, kind, id);
    Ok(ApiResponse::message(format!("Success delete {} quiz", kind.label().to_lowercase())))
}
