//! Media library endpoints

use axum::extract::{
    Multipart, Path, State,
    multipart::{Field, MultipartError},
};
use serde::Deserialize;
use serde_json::json;

use super::{ApiJson, ApiQuery, ApiResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::query::MediaListParams;
use crate::error::AppError;
use crate::service::{MediaPatch, UploadFile, UploadMeta};

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub name: Option<String>,
}

fn multipart_error(error: MultipartError) -> AppError {
    AppError::Validation(format!("Failed to parse multipart: {error}"))
}

async fn read_file(field: Field<'_>) -> Result<UploadFile, AppError> {
    let original_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(UploadFile {
        original_name,
        content_type,
        data: data.to_vec(),
    })
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

/// GET /api/media
pub async fn list_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<MediaListParams>,
) -> Result<ApiResponse, AppError> {
    let (page, folders) = state
        .media_service()
        .list(&session.user_id, params)
        .await?;

    Ok(ApiResponse::ok(json!({
        "media": page.items,
        "folders": folders,
        "pagination": page.pagination,
    })))
}

/// GET /api/media/folders
pub async fn list_folders(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<ApiResponse, AppError> {
    let folders = state.media_service().folders(&session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "folders": folders })))
}

/// POST /api/media/folders
pub async fn create_folder(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    ApiJson(request): ApiJson<CreateFolderRequest>,
) -> Result<ApiResponse, AppError> {
    let folder = state
        .media_service()
        .create_folder(request.name.as_deref())?;
    Ok(ApiResponse::created(json!({ "folder": folder }))
        .with_message("Folder created successfully"))
}

/// POST /api/media/upload
///
/// Multipart fields: `file`, plus optional `folder`, `caption`, `tags`
/// (comma-separated) and `alt_text`.
pub async fn upload_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<ApiResponse, AppError> {
    let mut file: Option<UploadFile> = None;
    let mut meta = UploadMeta::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => file = Some(read_file(field).await?),
            "folder" => meta.folder = Some(read_text(field).await?),
            "caption" => meta.caption = Some(read_text(field).await?),
            "tags" => meta.tags = Some(read_text(field).await?),
            "alt_text" => meta.alt_text = Some(read_text(field).await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    let media = state
        .media_service()
        .upload(&session.user_id, file, meta)
        .await?;

    Ok(ApiResponse::created(json!({ "media": media }))
        .with_message("File uploaded successfully"))
}

/// POST /api/media/upload-multiple
///
/// Multipart fields: one or more `files`, plus an optional `folder`.
/// The whole request is bounded by the route's body limit.
pub async fn upload_multiple_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<ApiResponse, AppError> {
    let mut files = Vec::new();
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" => files.push(read_file(field).await?),
            "folder" => folder = Some(read_text(field).await?),
            _ => {}
        }
    }

    let result = state
        .media_service()
        .upload_many(&session.user_id, files, folder)
        .await?;
    let message = format!("{} files uploaded successfully", result.uploaded.len());

    Ok(ApiResponse::created(json!({
        "media": result.uploaded,
        "failed": result.failed,
    }))
    .with_message(message))
}

/// PATCH /api/media/:id
pub async fn update_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<MediaPatch>,
) -> Result<ApiResponse, AppError> {
    let media = state
        .media_service()
        .update(&id, &session.user_id, patch)
        .await?;
    Ok(ApiResponse::ok(json!({ "media": media })).with_message("Media updated successfully"))
}

/// DELETE /api/media/:id
pub async fn delete_media(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    state
        .media_service()
        .delete(&id, &session.user_id)
        .await?;
    Ok(ApiResponse::message("Media deleted successfully"))
}
