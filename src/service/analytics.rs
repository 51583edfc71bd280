//! Analytics reporting
//!
//! Read-only views over posts and accounts. Figures that no pipeline
//! collects yet come from the [`EngagementEstimator`] and are flagged
//! `synthetic` in every response that carries them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::estimate::{DailyMetrics, EngagementEstimator, EngagementTotals};
use crate::data::{
    Account, AnalyticsReport, Database, DateRange, Engagement, ListQuery, Platform,
    PlatformAccountStats, PlatformStatus, Post, PostMedia, PostStatus, Table,
};
use crate::error::AppError;

const RECENT_DASHBOARD_POSTS: i64 = 5;
const RECENT_PLATFORM_POSTS: usize = 10;
const DAILY_METRIC_DAYS: u32 = 30;
const EXPORT_CONTENT_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub total_posts: i64,
    pub published_posts: i64,
    pub scheduled_posts: i64,
    pub failed_posts: i64,
    pub draft_posts: i64,
    pub connected_accounts: i64,
    #[serde(flatten)]
    pub engagement: EngagementTotals,
    pub synthetic: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub overview: DashboardOverview,
    pub platform_breakdown: Vec<PlatformAccountStats>,
    pub recent_posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub content: String,
    pub media: Vec<PostMedia>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformDelivery {
    pub platform: Platform,
    pub account_id: String,
    pub status: PlatformStatus,
    pub posted_at: Option<DateTime<Utc>>,
    pub engagement: Engagement,
    pub post_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostMetrics {
    pub total_engagement: i64,
    pub total_reach: i64,
    pub total_impressions: i64,
    pub engagement_rate: f64,
    pub platform_breakdown: Vec<PlatformDelivery>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub post: PostSummary,
    pub analytics: PostMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformSummary {
    pub total_posts: i64,
    pub published_posts: i64,
    pub total_engagement: i64,
    pub avg_engagement_rate: f64,
    pub total_reach: i64,
    pub total_followers: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformReport {
    pub platform: Platform,
    pub accounts: Vec<Account>,
    pub summary: PlatformSummary,
    pub daily_metrics: Vec<DailyMetrics>,
    pub synthetic: bool,
    pub recent_posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestTime {
    pub day: &'static str,
    pub hours: &'static [u8],
    pub engagement: &'static [u8],
}

/// Placeholder table until posting history is analysed
const BEST_TIMES: &[BestTime] = &[
    BestTime { day: "Monday", hours: &[9, 12, 17], engagement: &[45, 78, 92] },
    BestTime { day: "Tuesday", hours: &[8, 11, 15, 19], engagement: &[52, 85, 67, 88] },
    BestTime { day: "Wednesday", hours: &[9, 13, 17], engagement: &[48, 82, 95] },
    BestTime { day: "Thursday", hours: &[8, 12, 16, 20], engagement: &[55, 79, 71, 90] },
    BestTime { day: "Friday", hours: &[10, 14, 18], engagement: &[62, 75, 85] },
    BestTime { day: "Saturday", hours: &[11, 15, 19], engagement: &[70, 68, 80] },
    BestTime { day: "Sunday", hours: &[12, 16, 20], engagement: &[65, 72, 78] },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub platforms: String,
    pub published_at: Option<DateTime<Utc>>,
    pub engagement: i64,
    pub reach: i64,
    pub impressions: i64,
}

impl From<&Post> for ExportRow {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            content: post.content.chars().take(EXPORT_CONTENT_CHARS).collect(),
            platforms: post
                .platforms
                .iter()
                .map(|p| p.platform.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            published_at: post.published_at,
            engagement: post.analytics.total_engagement,
            reach: post.analytics.total_reach,
            impressions: post.analytics.total_impressions,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Analytics service
pub struct AnalyticsService {
    db: Arc<Database>,
    estimator: Arc<dyn EngagementEstimator>,
}

impl AnalyticsService {
    /// Create new analytics service
    pub fn new(db: Arc<Database>, estimator: Arc<dyn EngagementEstimator>) -> Self {
        Self { db, estimator }
    }

    /// Stored snapshot, or an empty document when none has been computed
    pub async fn overview(
        &self,
        user_id: &str,
        platform: Option<Platform>,
    ) -> Result<AnalyticsReport, AppError> {
        let mut report = self
            .db
            .get_analytics_report(user_id)
            .await?
            .unwrap_or_default();

        if let Some(platform) = platform {
            report.by_platform.retain(|m| m.platform == platform);
        }
        Ok(report)
    }

    pub async fn dashboard(&self, user_id: &str, range: DateRange) -> Result<Dashboard, AppError> {
        let posts = ListQuery::for_owner(Table::Posts, user_id).within("created_at", range);

        let by_status = self.db.count_posts_by_status(&posts).await?;
        let count = |status: PostStatus| {
            by_status
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n)
        };

        let connected = ListQuery::for_owner(Table::Accounts, user_id).eq_bool("is_connected", true);
        let connected_accounts = self.db.count_accounts(&connected).await?;

        let overview = DashboardOverview {
            total_posts: by_status.iter().map(|(_, n)| n).sum(),
            published_posts: count(PostStatus::Published),
            scheduled_posts: count(PostStatus::Scheduled),
            failed_posts: count(PostStatus::Failed),
            draft_posts: count(PostStatus::Draft),
            connected_accounts,
            engagement: self.estimator.totals(),
            synthetic: true,
        };

        Ok(Dashboard {
            overview,
            platform_breakdown: self.db.account_platform_stats(user_id).await?,
            recent_posts: self
                .db
                .select_first_posts(&posts, RECENT_DASHBOARD_POSTS)
                .await?,
        })
    }

    /// Stored per-platform figures for one post, deleted posts included
    pub async fn post_report(&self, id: &str, user_id: &str) -> Result<PostReport, AppError> {
        let post = self
            .db
            .get_post_including_deleted(id, user_id)
            .await?
            .ok_or(AppError::NotFound("Post"))?;

        let analytics = PostMetrics {
            total_engagement: post.total_interactions(),
            total_reach: post.analytics.total_reach,
            total_impressions: post.analytics.total_impressions,
            engagement_rate: post.analytics.engagement_rate,
            platform_breakdown: post
                .platforms
                .iter()
                .map(|p| PlatformDelivery {
                    platform: p.platform,
                    account_id: p.account_id.clone(),
                    status: p.status,
                    posted_at: p.posted_at,
                    engagement: p.engagement,
                    post_url: p.post_url.clone(),
                })
                .collect(),
        };

        Ok(PostReport {
            post: PostSummary {
                id: post.id,
                title: post.title,
                content: post.content,
                media: post.media,
                status: post.status,
                created_at: post.created_at,
                published_at: post.published_at,
            },
            analytics,
        })
    }

    pub async fn platform_report(
        &self,
        user_id: &str,
        platform: Platform,
        range: DateRange,
    ) -> Result<PlatformReport, AppError> {
        let accounts = self
            .db
            .select_accounts(
                &ListQuery::for_owner(Table::Accounts, user_id)
                    .eq_text("platform", platform.as_str())
                    .eq_bool("is_connected", true),
            )
            .await?;
        if accounts.is_empty() {
            return Err(AppError::NotFound("Connected account for this platform"));
        }

        let posts = self
            .db
            .select_posts(
                &ListQuery::for_owner(Table::Posts, user_id)
                    .any_element("platforms", "platform", platform.as_str())
                    .within("created_at", range),
            )
            .await?;

        let total_posts = posts.len() as i64;
        let total_engagement: i64 = posts.iter().map(|p| p.analytics.total_engagement).sum();
        let summary = PlatformSummary {
            total_posts,
            published_posts: posts.iter().filter(|p| p.is_published()).count() as i64,
            total_engagement,
            avg_engagement_rate: if total_posts > 0 {
                round2(total_engagement as f64 / total_posts as f64)
            } else {
                0.0
            },
            total_reach: posts.iter().map(|p| p.analytics.total_reach).sum(),
            total_followers: accounts.iter().map(|a| a.followers_count).sum(),
        };

        Ok(PlatformReport {
            platform,
            accounts,
            summary,
            daily_metrics: self
                .estimator
                .daily_metrics(Utc::now().date_naive(), DAILY_METRIC_DAYS),
            synthetic: true,
            recent_posts: posts.into_iter().take(RECENT_PLATFORM_POSTS).collect(),
        })
    }

    pub fn best_times(&self) -> &'static [BestTime] {
        BEST_TIMES
    }

    /// Published posts as flat rows. Only JSON is produced.
    pub async fn export(&self, user_id: &str, format: Option<&str>) -> Result<Vec<ExportRow>, AppError> {
        match format.map(str::trim).filter(|f| !f.is_empty()) {
            None | Some("json") => {}
            Some("csv") => {
                return Err(AppError::Validation(
                    "CSV export is not supported; use format=json".to_string(),
                ));
            }
            Some(other) => {
                return Err(AppError::Validation(format!("invalid export format: {other}")));
            }
        }

        let query = ListQuery::for_owner(Table::Posts, user_id)
            .eq_text("status", PostStatus::Published.as_str());
        let posts = self.db.select_posts(&query).await?;
        Ok(posts.iter().map(ExportRow::from).collect())
    }
}
