//! API layer
//!
//! HTTP handlers for:
//! - Social accounts
//! - Posts and their publishing lifecycle
//! - Media library uploads
//! - Analytics
//! - Metrics (Prometheus)

mod accounts;
mod analytics;
mod dto;
mod extract;
mod media;
pub mod metrics;
mod posts;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
};

use crate::AppState;
use crate::auth::require_auth;

pub use dto::{ApiResponse, Envelope};
pub use extract::{ApiJson, ApiQuery};
pub use metrics::{metrics_router, track_http_metrics};

/// Multipart framing allowance on top of the raw file bytes
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the `/api` router. Every route requires a valid session.
pub fn api_router(state: AppState) -> Router<AppState> {
    let uploads = &state.config.uploads;
    let single_upload_limit = uploads.max_file_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    let multi_upload_limit = uploads
        .max_file_bytes
        .saturating_mul(uploads.max_files)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let accounts = Router::new()
        .route("/", get(accounts::list_accounts))
        .route("/stats", get(accounts::account_stats))
        .route("/connect", post(accounts::connect_account))
        .route(
            "/:id",
            get(accounts::get_account).delete(accounts::delete_account),
        )
        .route("/:id/disconnect", post(accounts::disconnect_account))
        .route("/:id/settings", patch(accounts::update_account_settings))
        .route("/:id/refresh", post(accounts::refresh_account_token))
        .route("/:id/sync", post(accounts::sync_account));

    let posts = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route("/scheduled", get(posts::scheduled_posts))
        .route(
            "/:id",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/:id/publish", post(posts::publish_post))
        .route("/:id/schedule", post(posts::schedule_post))
        .route("/:id/cancel", post(posts::cancel_post))
        .route("/:id/duplicate", post(posts::duplicate_post));

    let media = Router::new()
        .route("/", get(media::list_media))
        .route(
            "/folders",
            get(media::list_folders).post(media::create_folder),
        )
        .route(
            "/upload",
            post(media::upload_media).layer(DefaultBodyLimit::max(single_upload_limit)),
        )
        .route(
            "/upload-multiple",
            post(media::upload_multiple_media).layer(DefaultBodyLimit::max(multi_upload_limit)),
        )
        .route(
            "/:id",
            patch(media::update_media).delete(media::delete_media),
        );

    let analytics = Router::new()
        .route("/", get(analytics::overview))
        .route("/dashboard", get(analytics::dashboard))
        .route("/posts/:id", get(analytics::post_analytics))
        .route("/platform/:platform", get(analytics::platform_analytics))
        .route("/best-time-to-post", get(analytics::best_time_to_post))
        .route("/export", get(analytics::export));

    Router::new()
        .nest("/accounts", accounts)
        .nest("/posts", posts)
        .nest("/media", media)
        .nest("/analytics", analytics)
        .layer(middleware::from_fn_with_state(state, require_auth))
}
