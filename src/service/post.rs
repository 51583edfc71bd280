//! Post service
//!
//! Compose, edit, schedule and publish posts. Every write goes through
//! `Database::insert_post` / `Database::save_post`, which reconcile the
//! aggregate status from the platform sub-records.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::dispatch::PublishDispatcher;
use crate::auth::Session;
use crate::data::query::{PostListParams, Sort, SortDirection};
use crate::data::{
    Database, DateRange, DeliveryOutcome, EntityId, LinkPreview, ListQuery, Location, Page,
    Platform, PlatformPost, Post, PostAnalytics, PostMedia, PostSettings, PostSettingsPatch,
    PostStatus, PostType, Table, initial_platform_status,
};
use crate::error::AppError;
use crate::metrics::POST_TRANSITIONS_TOTAL;

pub const MAX_CONTENT_CHARS: usize = 5000;

const INVALID_ACCOUNTS: &str = "One or more social accounts are invalid or disconnected";

/// Requested platform target
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInput {
    pub platform: Platform,
    #[serde(alias = "account")]
    pub account_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub platforms: Vec<TargetInput>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub post_type: Option<PostType>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub link_preview: Option<LinkPreview>,
    #[serde(default)]
    pub settings: Option<PostSettingsPatch>,
    #[serde(default)]
    pub media: Vec<PostMedia>,
    #[serde(default)]
    pub notes: String,
}

/// Partial edit; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub platforms: Option<Vec<TargetInput>>,
    /// `null` clears the schedule, a timestamp sets it
    #[serde(default, deserialize_with = "present")]
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub timezone: Option<String>,
    pub post_type: Option<PostType>,
    pub tags: Option<Vec<String>>,
    pub location: Option<Location>,
    pub link_preview: Option<LinkPreview>,
    pub settings: Option<PostSettingsPatch>,
    pub media: Option<Vec<PostMedia>>,
    pub notes: Option<String>,
}

/// Distinguishes an explicit `null` from an absent key
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::Validation(format!(
            "Content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

/// Parse a client-supplied schedule time
pub fn parse_schedule_time(raw: Option<&str>) -> Result<DateTime<Utc>, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("scheduled_at is required".to_string()))?;

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::Validation("scheduled_at must be an RFC 3339 timestamp".to_string()))
}

/// Post service
pub struct PostService {
    db: Arc<Database>,
    dispatcher: Arc<dyn PublishDispatcher>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>, dispatcher: Arc<dyn PublishDispatcher>) -> Self {
        Self { db, dispatcher }
    }

    pub async fn list(&self, user_id: &str, params: PostListParams) -> Result<Page<Post>, AppError> {
        let (query, page) = params.into_query(user_id)?;
        self.db.list_posts(&query, page).await
    }

    /// Non-deleted post owned by the user
    pub async fn get(&self, id: &str, user_id: &str) -> Result<Post, AppError> {
        self.db
            .get_post(id, user_id)
            .await?
            .ok_or(AppError::NotFound("Post"))
    }

    /// Scheduled posts ordered by their schedule time, soonest first
    pub async fn scheduled(&self, user_id: &str, range: DateRange) -> Result<Vec<Post>, AppError> {
        let query = ListQuery::for_owner(Table::Posts, user_id)
            .eq_text("status", PostStatus::Scheduled.as_str())
            .within("scheduled_at", range)
            .sorted(Sort::by("scheduled_at", SortDirection::Asc));
        self.db.select_posts(&query).await
    }

    /// Every target must name a distinct, connected account of the user on
    /// the stated platform.
    async fn resolve_targets(
        &self,
        user_id: &str,
        targets: &[TargetInput],
    ) -> Result<Vec<PlatformPost>, AppError> {
        let ids: Vec<String> = targets.iter().map(|t| t.account_id.clone()).collect();
        let distinct: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if distinct.len() != ids.len() {
            return Err(AppError::Validation(INVALID_ACCOUNTS.to_string()));
        }

        let accounts = self.db.connected_accounts_by_ids(user_id, &ids).await?;
        if accounts.len() != ids.len() {
            return Err(AppError::Validation(INVALID_ACCOUNTS.to_string()));
        }

        let platform_matches = targets.iter().all(|target| {
            accounts
                .iter()
                .any(|a| a.id == target.account_id && a.platform == target.platform)
        });
        if !platform_matches {
            return Err(AppError::Validation(INVALID_ACCOUNTS.to_string()));
        }

        // Status is assigned by the caller
        Ok(targets
            .iter()
            .map(|t| PlatformPost::target(t.platform, t.account_id.clone(), Default::default()))
            .collect())
    }

    pub async fn create(&self, session: &Session, input: CreatePost) -> Result<Post, AppError> {
        validate_content(&input.content)?;
        if input.platforms.is_empty() {
            return Err(AppError::Validation(
                "At least one platform is required".to_string(),
            ));
        }

        let targets = self.resolve_targets(&session.user_id, &input.platforms).await?;
        let scheduled = input.scheduled_at.is_some();
        let sub_status = initial_platform_status(scheduled);

        let mut settings = PostSettings::default();
        if let Some(patch) = input.settings {
            settings.apply(patch);
        }

        let now = Utc::now();
        let mut post = Post {
            id: EntityId::new().0,
            user_id: session.user_id.clone(),
            title: input.title,
            content: input.content,
            media: input.media,
            platforms: targets
                .into_iter()
                .map(|t| PlatformPost { status: sub_status, ..t })
                .collect(),
            status: if scheduled {
                PostStatus::Scheduled
            } else {
                PostStatus::Draft
            },
            scheduled_at: input.scheduled_at,
            timezone: input
                .timezone
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or_else(|| session.timezone_or_utc()),
            post_type: input.post_type.unwrap_or_default(),
            tags: input.tags,
            location: input.location,
            link_preview: input.link_preview,
            settings,
            analytics: PostAnalytics::default(),
            notes: input.notes,
            created_at: now,
            updated_at: now,
            published_at: None,
            is_deleted: false,
        };

        self.db.insert_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["create"]).inc();
        tracing::info!(post_id = %post.id, status = %post.status, "Post created");
        Ok(post)
    }

    /// Apply a partial edit to an unpublished post.
    ///
    /// Targets are validated before anything is changed, so a rejected
    /// update writes nothing.
    pub async fn update(&self, id: &str, user_id: &str, input: UpdatePost) -> Result<Post, AppError> {
        let mut post = self.get(id, user_id).await?;
        post.ensure_editable()?;

        if let Some(content) = &input.content {
            validate_content(content)?;
        }
        let targets = match input.platforms.as_deref() {
            Some(targets) if !targets.is_empty() => {
                Some(self.resolve_targets(user_id, targets).await?)
            }
            _ => None,
        };

        if let Some(title) = input.title {
            post.title = title;
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        if let Some(scheduled_at) = input.scheduled_at {
            post.set_schedule_time(scheduled_at);
        }
        if let Some(timezone) = input.timezone {
            post.timezone = timezone;
        }
        if let Some(post_type) = input.post_type {
            post.post_type = post_type;
        }
        if let Some(tags) = input.tags {
            post.tags = tags;
        }
        if let Some(location) = input.location {
            post.location = Some(location);
        }
        if let Some(link_preview) = input.link_preview {
            post.link_preview = Some(link_preview);
        }
        if let Some(settings) = input.settings {
            post.settings.apply(settings);
        }
        if let Some(media) = input.media {
            post.media = media;
        }
        if let Some(notes) = input.notes {
            post.notes = notes;
        }
        if let Some(targets) = targets {
            post.replace_targets(targets);
        }

        self.db.save_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["update"]).inc();
        Ok(post)
    }

    /// Soft delete; deleting an already-deleted post succeeds
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let mut post = self
            .db
            .get_post_including_deleted(id, user_id)
            .await?
            .ok_or(AppError::NotFound("Post"))?;

        post.is_deleted = true;
        self.db.save_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["delete"]).inc();
        tracing::info!(post_id = %post.id, "Post deleted");
        Ok(())
    }

    /// Move the post to `publishing` and hand it to the dispatcher.
    ///
    /// Dispatch runs detached; its failures are logged only.
    pub async fn publish(&self, id: &str, user_id: &str) -> Result<Post, AppError> {
        let mut post = self.get(id, user_id).await?;
        post.start_publishing()?;
        self.db.save_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["publish"]).inc();

        self.spawn_dispatch(post.clone());
        Ok(post)
    }

    fn spawn_dispatch(&self, post: Post) -> tokio::task::JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            if let Err(error) = dispatcher.dispatch(&post).await {
                tracing::error!(post_id = %post.id, %error, "Publish dispatch failed");
            }
        })
    }

    pub async fn schedule(
        &self,
        id: &str,
        user_id: &str,
        when: DateTime<Utc>,
    ) -> Result<Post, AppError> {
        let mut post = self.get(id, user_id).await?;
        post.schedule(when)?;
        self.db.save_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["schedule"]).inc();
        Ok(post)
    }

    pub async fn cancel(&self, id: &str, user_id: &str) -> Result<Post, AppError> {
        let mut post = self.get(id, user_id).await?;
        post.cancel_schedule()?;
        self.db.save_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["cancel"]).inc();
        Ok(post)
    }

    pub async fn duplicate(&self, id: &str, user_id: &str) -> Result<Post, AppError> {
        let original = self.get(id, user_id).await?;
        let mut copy = original.duplicate(Utc::now());
        self.db.insert_post(&mut copy).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["duplicate"]).inc();
        Ok(copy)
    }

    /// Apply a delivery report for one platform target and re-derive the
    /// aggregate status.
    pub async fn record_delivery(
        &self,
        id: &str,
        user_id: &str,
        account_id: &str,
        outcome: DeliveryOutcome,
    ) -> Result<Post, AppError> {
        let mut post = self.get(id, user_id).await?;
        post.record_delivery(account_id, outcome, Utc::now())?;
        self.db.save_post(&mut post).await?;
        POST_TRANSITIONS_TOTAL.with_label_values(&["delivery"]).inc();
        tracing::info!(post_id = %post.id, status = %post.status, "Delivery recorded");
        Ok(post)
    }
}
