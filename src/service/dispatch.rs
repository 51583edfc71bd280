//! Publish dispatch
//!
//! A post that enters `publishing` is handed to a [`PublishDispatcher`].
//! A real delivery pipeline reports back through
//! `PostService::record_delivery`.

use async_trait::async_trait;

use crate::data::Post;
use crate::error::AppError;

/// Hand-off point for delivering a post to its target platforms
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublishDispatcher: Send + Sync {
    async fn dispatch(&self, post: &Post) -> Result<(), AppError>;
}

/// Dispatcher that only records the hand-off in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

#[async_trait]
impl PublishDispatcher for LoggingDispatcher {
    async fn dispatch(&self, post: &Post) -> Result<(), AppError> {
        let platforms: Vec<&str> = post.platforms.iter().map(|p| p.platform.as_str()).collect();
        tracing::info!(
            post_id = %post.id,
            user_id = %post.user_id,
            platforms = ?platforms,
            "Post handed to publish dispatcher"
        );
        Ok(())
    }
}
