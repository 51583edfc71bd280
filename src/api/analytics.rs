//! Analytics endpoints

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

use super::{ApiQuery, ApiResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{DateRange, Platform};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeParams {
    fn range(&self) -> Result<DateRange, AppError> {
        DateRange::parse(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OverviewParams {
    pub platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

/// GET /api/analytics
pub async fn overview(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<OverviewParams>,
) -> Result<ApiResponse, AppError> {
    let platform = params
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse::<Platform>)
        .transpose()?;

    let analytics = state
        .analytics_service()
        .overview(&session.user_id, platform)
        .await?;
    Ok(ApiResponse::ok(json!({ "analytics": analytics })))
}

/// GET /api/analytics/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<RangeParams>,
) -> Result<ApiResponse, AppError> {
    let dashboard = state
        .analytics_service()
        .dashboard(&session.user_id, params.range()?)
        .await?;
    Ok(ApiResponse::ok(json!(dashboard)))
}

/// GET /api/analytics/posts/:id
pub async fn post_analytics(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let report = state
        .analytics_service()
        .post_report(&id, &session.user_id)
        .await?;
    Ok(ApiResponse::ok(json!(report)))
}

/// GET /api/analytics/platform/:platform
pub async fn platform_analytics(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(platform): Path<String>,
    ApiQuery(params): ApiQuery<RangeParams>,
) -> Result<ApiResponse, AppError> {
    let platform: Platform = platform.parse()?;
    let report = state
        .analytics_service()
        .platform_report(&session.user_id, platform, params.range()?)
        .await?;
    Ok(ApiResponse::ok(json!(report)))
}

/// GET /api/analytics/best-time-to-post
pub async fn best_time_to_post(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
) -> ApiResponse {
    ApiResponse::ok(json!({
        "best_times": state.analytics_service().best_times(),
        "synthetic": true,
    }))
}

/// GET /api/analytics/export
pub async fn export(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<ExportParams>,
) -> Result<ApiResponse, AppError> {
    let rows = state
        .analytics_service()
        .export(&session.user_id, params.format.as_deref())
        .await?;
    Ok(ApiResponse::ok(json!({
        "format": "json",
        "posts": rows,
    })))
}
