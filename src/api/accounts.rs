//! Social account endpoints

use axum::extract::{Path, State};
use serde_json::json;

use super::{ApiJson, ApiQuery, ApiResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::AccountSettingsPatch;
use crate::data::query::AccountListParams;
use crate::error::AppError;
use crate::service::{ConnectAccount, Connection};

/// GET /api/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiQuery(params): ApiQuery<AccountListParams>,
) -> Result<ApiResponse, AppError> {
    let page = state
        .account_service()
        .list(&session.user_id, params)
        .await?;

    Ok(ApiResponse::ok(json!({
        "accounts": page.items,
        "pagination": page.pagination,
    })))
}

/// GET /api/accounts/stats
pub async fn account_stats(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<ApiResponse, AppError> {
    let stats = state
        .account_service()
        .platform_stats(&session.user_id)
        .await?;
    Ok(ApiResponse::ok(json!({ "stats": stats })))
}

/// GET /api/accounts/:id
pub async fn get_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let account = state.account_service().get(&id, &session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "account": account })))
}

/// POST /api/accounts/connect
///
/// 201 for a new account, 200 when an existing identity is reconnected.
pub async fn connect_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ApiJson(input): ApiJson<ConnectAccount>,
) -> Result<ApiResponse, AppError> {
    let response = match state
        .account_service()
        .connect(&session.user_id, input)
        .await?
    {
        Connection::Created(account) => ApiResponse::created(json!({ "account": account }))
            .with_message("Account connected successfully"),
        Connection::Reconnected(account) => ApiResponse::ok(json!({ "account": account }))
            .with_message("Account reconnected successfully"),
    };
    Ok(response)
}

/// POST /api/accounts/:id/disconnect
pub async fn disconnect_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let account = state
        .account_service()
        .disconnect(&id, &session.user_id)
        .await?;
    Ok(ApiResponse::ok(json!({ "account": account }))
        .with_message("Account disconnected successfully"))
}

/// DELETE /api/accounts/:id
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    state
        .account_service()
        .delete(&id, &session.user_id)
        .await?;
    Ok(ApiResponse::message("Account deleted successfully"))
}

/// PATCH /api/accounts/:id/settings
pub async fn update_account_settings(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<AccountSettingsPatch>,
) -> Result<ApiResponse, AppError> {
    let account = state
        .account_service()
        .update_settings(&id, &session.user_id, patch)
        .await?;
    Ok(ApiResponse::ok(json!({ "account": account }))
        .with_message("Account settings updated successfully"))
}

/// POST /api/accounts/:id/refresh
pub async fn refresh_account_token(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    state
        .account_service()
        .refresh_token(&id, &session.user_id)
        .await?;
    Ok(ApiResponse::message("Token refresh initiated"))
}

/// POST /api/accounts/:id/sync
pub async fn sync_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse, AppError> {
    let account = state.account_service().sync(&id, &session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "account": account }))
        .with_message("Account synced successfully"))
}
