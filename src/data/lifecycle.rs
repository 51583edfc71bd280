//! Post lifecycle
//!
//! The aggregate `status` of a post is a pure function of its per-platform
//! sub-statuses. The database layer calls [`Post::reconcile_status`] before
//! every write; the transitions below only set up sub-statuses and let the
//! reconciliation decide the aggregate.

use chrono::{DateTime, Utc};

use super::models::{
    DeliveryOutcome, EntityId, PlatformPost, PlatformStatus, Post, PostAnalytics, PostStatus,
};
use crate::error::AppError;

/// Derive the aggregate status from the sub-statuses.
///
/// Rules are evaluated in order and the first match wins:
/// 1. all published => published
/// 2. any publishing => publishing
/// 3. any failed => failed
/// 4. all scheduled => scheduled
///
/// `None` means no rule applies (mixed pending/cancelled states, or no
/// platforms at all) and the current aggregate must be kept.
pub fn derive_aggregate_status(statuses: &[PlatformStatus]) -> Option<PostStatus> {
    if statuses.is_empty() {
        return None;
    }

    if statuses.iter().all(|s| *s == PlatformStatus::Published) {
        Some(PostStatus::Published)
    } else if statuses.contains(&PlatformStatus::Publishing) {
        Some(PostStatus::Publishing)
    } else if statuses.contains(&PlatformStatus::Failed) {
        Some(PostStatus::Failed)
    } else if statuses.iter().all(|s| *s == PlatformStatus::Scheduled) {
        Some(PostStatus::Scheduled)
    } else {
        None
    }
}

/// Initial sub-status for a target given whether the post has a schedule time
pub fn initial_platform_status(scheduled: bool) -> PlatformStatus {
    if scheduled {
        PlatformStatus::Scheduled
    } else {
        PlatformStatus::Pending
    }
}

impl Post {
    /// Recompute the aggregate status and stamp `updated_at`.
    pub fn reconcile_status(&mut self, now: DateTime<Utc>) {
        let statuses: Vec<PlatformStatus> = self.platforms.iter().map(|p| p.status).collect();

        if let Some(status) = derive_aggregate_status(&statuses) {
            self.status = status;
            if status == PostStatus::Published && self.published_at.is_none() {
                self.published_at = Some(now);
            }
        }

        self.updated_at = now;
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Published posts are frozen
    pub fn ensure_editable(&self) -> Result<(), AppError> {
        if self.is_published() {
            return Err(AppError::Conflict("Cannot edit published posts".to_string()));
        }
        Ok(())
    }

    /// Set or clear the schedule time as part of an edit.
    ///
    /// Sub-statuses are left alone, so clearing the time on a post whose
    /// targets are all scheduled reconciles back to scheduled.
    pub fn set_schedule_time(&mut self, scheduled_at: Option<DateTime<Utc>>) {
        self.scheduled_at = scheduled_at;
        self.status = if scheduled_at.is_some() {
            PostStatus::Scheduled
        } else {
            PostStatus::Draft
        };
    }

    /// Replace the platform targets; new sub-records start fresh.
    pub fn replace_targets(&mut self, targets: Vec<PlatformPost>) {
        let status = initial_platform_status(self.scheduled_at.is_some());
        self.platforms = targets
            .into_iter()
            .map(|target| PlatformPost::target(target.platform, target.account_id, status))
            .collect();
    }

    pub fn schedule(&mut self, when: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_published() {
            return Err(AppError::Conflict(
                "Cannot schedule published posts".to_string(),
            ));
        }

        self.scheduled_at = Some(when);
        self.status = PostStatus::Scheduled;
        self.force_unpublished_targets(PlatformStatus::Scheduled);
        Ok(())
    }

    pub fn cancel_schedule(&mut self) -> Result<(), AppError> {
        if self.status != PostStatus::Scheduled {
            return Err(AppError::Conflict("Post is not scheduled".to_string()));
        }

        self.scheduled_at = None;
        self.status = PostStatus::Draft;
        for target in &mut self.platforms {
            target.status = PlatformStatus::Cancelled;
        }
        Ok(())
    }

    pub fn start_publishing(&mut self) -> Result<(), AppError> {
        if self.is_published() {
            return Err(AppError::Conflict("Post is already published".to_string()));
        }

        self.status = PostStatus::Publishing;
        self.force_unpublished_targets(PlatformStatus::Publishing);
        Ok(())
    }

    /// Copy of the post's composition with every delivery trace dropped
    pub fn duplicate(&self, now: DateTime<Utc>) -> Post {
        let platforms = self
            .platforms
            .iter()
            .map(|p| PlatformPost::target(p.platform, p.account_id.clone(), PlatformStatus::Pending))
            .collect();

        Post {
            id: EntityId::new().0,
            user_id: self.user_id.clone(),
            title: format!("{} (Copy)", self.title),
            content: self.content.clone(),
            media: self.media.clone(),
            platforms,
            status: PostStatus::Draft,
            scheduled_at: None,
            timezone: self.timezone.clone(),
            post_type: self.post_type,
            tags: self.tags.clone(),
            location: self.location.clone(),
            link_preview: self.link_preview.clone(),
            settings: self.settings.clone(),
            analytics: PostAnalytics::default(),
            notes: String::new(),
            created_at: now,
            updated_at: now,
            published_at: None,
            is_deleted: false,
        }
    }

    /// Apply a delivery result to the sub-record targeting `account_id`.
    pub fn record_delivery(
        &mut self,
        account_id: &str,
        outcome: DeliveryOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let target = self
            .platforms
            .iter_mut()
            .find(|p| p.account_id == account_id)
            .ok_or(AppError::NotFound("Platform target"))?;

        match outcome {
            DeliveryOutcome::Published {
                platform_post_id,
                post_url,
            } => {
                target.status = PlatformStatus::Published;
                target.platform_post_id = platform_post_id;
                target.post_url = post_url;
                target.posted_at = Some(now);
                target.error_message = None;
            }
            DeliveryOutcome::Failed { error } => {
                target.status = PlatformStatus::Failed;
                target.error_message = Some(error);
                target.retry_count += 1;
            }
        }

        Ok(())
    }

    /// Sum of likes, comments and shares across every stored sub-record
    pub fn total_interactions(&self) -> i64 {
        self.platforms
            .iter()
            .map(|p| p.engagement.interactions())
            .sum()
    }

    fn force_unpublished_targets(&mut self, status: PlatformStatus) {
        for target in &mut self.platforms {
            if target.status != PlatformStatus::Published {
                target.status = status;
            }
        }
    }
}
