//! SocialFlow - a social media scheduling backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /api/accounts, /api/posts, /api/media, /api/analytics    │
//! │  - Session verification middleware                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Post lifecycle, account connections, media library       │
//! │  - Analytics reporting                                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - R2 or local media storage                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Database, post lifecycle and listing queries
//! - `storage`: Media object storage
//! - `auth`: Signed session tokens
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

use config::MediaBackend;
use service::{
    AccountService, AnalyticsService, EngagementEstimator, LoggingDispatcher, MediaService,
    PostService, PublishDispatcher, SyntheticEngagement,
};
use storage::{LocalMediaStore, MediaStore, R2MediaStore};

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Media object storage (R2 or local directory)
    pub media_store: Arc<dyn MediaStore>,

    /// Receives posts moved to `publishing`
    pub dispatcher: Arc<dyn PublishDispatcher>,

    /// Source of figures no metrics pipeline provides yet
    pub estimator: Arc<dyn EngagementEstimator>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Set up the media store for the configured backend
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        // 2. Media storage
        let media = &config.storage.media;
        let media_store: Arc<dyn MediaStore> = match media.backend {
            MediaBackend::Local => {
                tokio::fs::create_dir_all(&media.local_dir)
                    .await
                    .map_err(|e| {
                        error::AppError::Storage(format!(
                            "failed to create {}: {e}",
                            media.local_dir.display()
                        ))
                    })?;
                Arc::new(LocalMediaStore::new(
                    media.local_dir.clone(),
                    media.public_url.clone(),
                ))
            }
            MediaBackend::R2 => {
                let cloudflare = config.cloudflare.as_ref().ok_or_else(|| {
                    error::AppError::Config(
                        "cloudflare credentials are required when storage.media.backend=r2"
                            .to_string(),
                    )
                })?;
                Arc::new(R2MediaStore::new(media, cloudflare))
            }
        };
        tracing::info!(backend = ?media.backend, "Media storage initialized");

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            media_store,
            dispatcher: Arc::new(LoggingDispatcher),
            estimator: Arc::new(SyntheticEngagement),
        })
    }

    pub fn account_service(&self) -> AccountService {
        AccountService::new(self.db.clone())
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(self.db.clone(), self.dispatcher.clone())
    }

    pub fn media_service(&self) -> MediaService {
        MediaService::new(
            self.db.clone(),
            self.media_store.clone(),
            self.config.uploads.clone(),
        )
    }

    pub fn analytics_service(&self) -> AnalyticsService {
        AnalyticsService::new(self.db.clone(), self.estimator.clone())
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    let mut router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router(state.clone()));

    // Local uploads are served from disk under their public prefix
    let media = &state.config.storage.media;
    if media.backend == MediaBackend::Local && media.public_url.starts_with('/') {
        router = router.nest_service(&media.public_url, ServeDir::new(&media.local_dir));
    }

    // Router::layer wraps inside out, so the last layer is outermost:
    // metrics see every response, including CORS preflights
    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(middleware::from_fn(api::track_http_metrics))
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> &'static str {
    "OK"
}
