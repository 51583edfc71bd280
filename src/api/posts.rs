//! Post endpoints

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

use super::{ApiJson, ApiQuery, ApiResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::DateRange;
use crate::data::query::PostListParams;
use crate::error::AppError;
use crate::service::{CreatePost, UpdatePost, parse_schedule_time};

#[derive(Debug, Default, Deserialize)]
pub struct ScheduledParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<PostListParams>,
) -> Result<ApiResponse, AppError> {
    let page = state.post_service().list(&session.user_id, params).await?;
    Ok(ApiResponse::ok(json!({
        "posts": page.items,
        "pagination": page.pagination,
    })))
}

/// GET /api/posts/scheduled
pub async fn scheduled_posts(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<ScheduledParams>,
) -> Result<ApiResponse, AppError> {
    let range = DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;
    let posts = state
        .post_service()
        .scheduled(&session.user_id, range)
        .await?;
    Ok(ApiResponse::ok(json!({ "posts": posts })))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let post = state.post_service().get(&id, &session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "post": post })))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiJson(input): ApiJson<CreatePost>,
) -> Result<ApiResponse, AppError> {
    let post = state.post_service().create(&session, input).await?;
    Ok(ApiResponse::created(json!({ "post": post })).with_message("Post created successfully"))
}

/// PATCH /api/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdatePost>,
) -> Result<ApiResponse, AppError> {
    let post = state
        .post_service()
        .update(&id, &session.user_id, input)
        .await?;
    Ok(ApiResponse::ok(json!({ "post": post })).with_message("Post updated successfully"))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    state.post_service().delete(&id, &session.user_id).await?;
    Ok(ApiResponse::message("Post deleted successfully"))
}

/// POST /api/posts/:id/publish
pub async fn publish_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let post = state.post_service().publish(&id, &session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "post": post })).with_message("Post is being published"))
}

/// POST /api/posts/:id/schedule
pub async fn schedule_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<ApiResponse, AppError> {
    let when = parse_schedule_time(request.scheduled_at.as_deref())?;
    let post = state
        .post_service()
        .schedule(&id, &session.user_id, when)
        .await?;
    Ok(ApiResponse::ok(json!({ "post": post })).with_message("Post scheduled successfully"))
}

/// POST /api/posts/:id/cancel
pub async fn cancel_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let post = state.post_service().cancel(&id, &session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "post": post }))
        .with_message("Post schedule cancelled successfully"))
}

/// POST /api/posts/:id/duplicate
pub async fn duplicate_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let post = state
        .post_service()
        .duplicate(&id, &session.user_id)
        .await?;
    Ok(ApiResponse::created(json!({ "post": post }))
        .with_message("Post duplicated successfully"))
}
