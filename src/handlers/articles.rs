// Article handlers: public reads for the app, CRUD for the CMS

use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::info;

use super::{MultipartBody, PathParam};
use crate::{
    app::AppState,
    auth::AdminSession,
    error::{ApiError, ApiResult},
    models::{ApiResponse, Article, Empty, NewArticleForm, Rows},
    storage::random_object_name,
    upload::UploadForm,
};

/// GET /artikel/:id
pub async fn view_article(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Rows<Article>>> {
    let article = state.db.get_article_by_id(id).await?;
    Ok(ApiResponse::rows("Success get artikel", article))
}

/// GET /artikel/search/:title
pub async fn search_articles(
    State(state): State<AppState>,
    WithRejection(Path(title), _): PathParam<String>,
) -> ApiResult<ApiResponse<Rows<Vec<Article>>>> {
    let articles = state.db.find_articles_by_title(title.trim()).await?;

    if articles.is_empty() {
        return Err(ApiError::not_found("Article not found"));
    }

    Ok(ApiResponse::rows("Success get artikel", articles))
}

/// GET /listartikel
pub async fn list_articles(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> ApiResult<ApiResponse<Rows<Vec<Article>>>> {
    let articles = state.db.get_all_articles().await?;
    Ok(ApiResponse::rows("Success get all artikel", articles))
}

/// POST /addArtikel
///
/// Multipart form with text fields `title` and `writerBy` and two files:
/// `file` (the article body) and `image` (the cover). Both blobs are uploaded
/// before the row is inserted.
pub async fn add_article(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    WithRejection(multipart, _): MultipartBody,
) -> ApiResult<ApiResponse<Rows<Article>>> {
    let mut form = UploadForm::read(multipart).await?;

    let fields = NewArticleForm {
        title: form.require_text("title")?,
        writer_by: form.require_text("writerBy")?,
    };
    fields.validate().map_err(ApiError::Validation)?;

    let content = form.take_file("file");
    let image = form.take_file("image");
    let (content, image) = match (content, image) {
        (Some(content), Some(image)) => (content, image),
        _ => return Err(ApiError::validation("Both content file and image are required")),
    };

    let content_type = content.content_type_or_default().to_string();
    let content_url = state
        .storage
        .upload(&random_object_name("content"), &content_type, content.bytes)
        .await?;

    let image_type = image.content_type_or_default().to_string();
    let image_url = state
        .storage
        .upload(&random_object_name("images"), &image_type, image.bytes)
        .await?;

    let article = state
        .db
        .create_article(
            fields.title.trim(),
            fields.writer_by.trim(),
            Utc::now().date_naive(),
            &content_url,
            &image_url,
        )
        .await?;

    info!("Admin {} added article {}", admin.id, article.id);
    Ok(ApiResponse::rows("Success add artikel", article))
}

/// DELETE /deleteArtikel/:id
pub async fn delete_article(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    WithRejection(Path(id), _): PathParam<i32>,
) -> ApiResult<ApiResponse<Empty>> {
    state.db.delete_article(id).await?;

    info!("Admin {} deleted article {}", admin.id, id);
    Ok(ApiResponse::message("Success delete artikel"))
}
