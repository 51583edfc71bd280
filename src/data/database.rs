//! SQLite database operations
//!
//! All database access goes through this module.
//! Embedded documents (platform targets, media copies, settings) live in
//! JSON text columns and are decoded through private row types.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{FromRow, Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use super::query::{ListQuery, Page, PageRequest, Pagination, Table};
use crate::error::AppError;

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

// =============================================================================
// Row types
// =============================================================================

#[derive(FromRow)]
struct AccountRow {
    id: String,
    user_id: String,
    platform: String,
    account_type: String,
    name: String,
    username: String,
    profile_picture: Option<String>,
    cover_image: Option<String>,
    bio: String,
    followers_count: i64,
    following_count: i64,
    posts_count: i64,
    is_connected: bool,
    is_active: bool,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    platform_user_id: String,
    page_id: Option<String>,
    page_access_token: Option<String>,
    permissions: Json<Vec<String>>,
    settings: Json<AccountSettings>,
    last_synced_at: DateTime<Utc>,
    connected_at: DateTime<Utc>,
    disconnected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            platform: row.platform.parse()?,
            account_type: row.account_type.parse()?,
            name: row.name,
            username: row.username,
            profile_picture: row.profile_picture,
            cover_image: row.cover_image,
            bio: row.bio,
            followers_count: row.followers_count,
            following_count: row.following_count,
            posts_count: row.posts_count,
            is_connected: row.is_connected,
            is_active: row.is_active,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_expires_at: row.token_expires_at,
            platform_user_id: row.platform_user_id,
            page_id: row.page_id,
            page_access_token: row.page_access_token,
            permissions: row.permissions.0,
            settings: row.settings.0,
            last_synced_at: row.last_synced_at,
            connected_at: row.connected_at,
            disconnected_at: row.disconnected_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PostRow {
    id: String,
    user_id: String,
    title: String,
    content: String,
    media: Json<Vec<PostMedia>>,
    platforms: Json<Vec<PlatformPost>>,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    timezone: String,
    post_type: String,
    tags: Json<Vec<String>>,
    location: Option<Json<Location>>,
    link_preview: Option<Json<LinkPreview>>,
    settings: Json<PostSettings>,
    analytics: Json<PostAnalytics>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    is_deleted: bool,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            content: row.content,
            media: row.media.0,
            platforms: row.platforms.0,
            status: row.status.parse()?,
            scheduled_at: row.scheduled_at,
            timezone: row.timezone,
            post_type: row.post_type.parse()?,
            tags: row.tags.0,
            location: row.location.map(|l| l.0),
            link_preview: row.link_preview.map(|l| l.0),
            settings: row.settings.0,
            analytics: row.analytics.0,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
            is_deleted: row.is_deleted,
        })
    }
}

#[derive(FromRow)]
struct MediaRow {
    id: String,
    user_id: String,
    filename: String,
    original_name: String,
    media_type: String,
    mime_type: String,
    size: i64,
    url: String,
    thumbnail: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    duration: Option<f64>,
    alt_text: String,
    caption: String,
    tags: Json<Vec<String>>,
    folder: String,
    is_used: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MediaRow> for Media {
    type Error = AppError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            filename: row.filename,
            original_name: row.original_name,
            media_type: row.media_type.parse()?,
            mime_type: row.mime_type,
            size: row.size,
            url: row.url,
            thumbnail: row.thumbnail,
            dimensions: Dimensions {
                width: row.width.and_then(|w| u32::try_from(w).ok()),
                height: row.height.and_then(|h| u32::try_from(h).ok()),
            },
            duration: row.duration,
            alt_text: row.alt_text,
            caption: row.caption,
            tags: row.tags.0,
            folder: row.folder,
            is_used: row.is_used,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Count + page fetch for any owner-scoped listing
    async fn fetch_page<R, T>(
        &self,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<T>, AppError>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        T: TryFrom<R, Error = AppError>,
    {
        let total: i64 = query
            .count()
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = query.select(Some(page));
        let rows: Vec<R> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert_rows(rows)?,
            pagination: Pagination::new(total, page),
        })
    }

    async fn fetch_all<R, T>(&self, mut select: QueryBuilder<'static, Sqlite>) -> Result<Vec<T>, AppError>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        T: TryFrom<R, Error = AppError>,
    {
        let rows: Vec<R> = select.build_query_as().fetch_all(&self.pool).await?;
        convert_rows(rows)
    }

    // =========================================================================
    // Social accounts
    // =========================================================================

    /// Get an account owned by `user_id`
    pub async fn get_account(&self, id: &str, user_id: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM social_accounts WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    /// Find an account by its platform identity, regardless of owner
    pub async fn find_account_by_identity(
        &self,
        platform: Platform,
        platform_user_id: &str,
    ) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM social_accounts WHERE platform = ? AND platform_user_id = ?",
        )
        .bind(platform.as_str())
        .bind(platform_user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO social_accounts (
                id, user_id, platform, account_type, name, username,
                profile_picture, cover_image, bio, followers_count, following_count,
                posts_count, is_connected, is_active, access_token, refresh_token,
                token_expires_at, platform_user_id, page_id, page_access_token,
                permissions, settings, last_synced_at, connected_at, disconnected_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.user_id)
        .bind(account.platform.as_str())
        .bind(account.account_type.as_str())
        .bind(&account.name)
        .bind(&account.username)
        .bind(&account.profile_picture)
        .bind(&account.cover_image)
        .bind(&account.bio)
        .bind(account.followers_count)
        .bind(account.following_count)
        .bind(account.posts_count)
        .bind(account.is_connected)
        .bind(account.is_active)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.token_expires_at)
        .bind(&account.platform_user_id)
        .bind(&account.page_id)
        .bind(&account.page_access_token)
        .bind(Json(&account.permissions))
        .bind(Json(&account.settings))
        .bind(account.last_synced_at)
        .bind(account.connected_at)
        .bind(account.disconnected_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite every mutable column, including the owner
    pub async fn update_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE social_accounts SET
                user_id = ?, account_type = ?, name = ?, username = ?,
                profile_picture = ?, cover_image = ?, bio = ?, followers_count = ?,
                following_count = ?, posts_count = ?, is_connected = ?, is_active = ?,
                access_token = ?, refresh_token = ?, token_expires_at = ?, page_id = ?,
                page_access_token = ?, permissions = ?, settings = ?, last_synced_at = ?,
                connected_at = ?, disconnected_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.user_id)
        .bind(account.account_type.as_str())
        .bind(&account.name)
        .bind(&account.username)
        .bind(&account.profile_picture)
        .bind(&account.cover_image)
        .bind(&account.bio)
        .bind(account.followers_count)
        .bind(account.following_count)
        .bind(account.posts_count)
        .bind(account.is_connected)
        .bind(account.is_active)
        .bind(&account.access_token)
        .bind(&account.refresh_token)
        .bind(account.token_expires_at)
        .bind(&account.page_id)
        .bind(&account.page_access_token)
        .bind(Json(&account.permissions))
        .bind(Json(&account.settings))
        .bind(account.last_synced_at)
        .bind(account.connected_at)
        .bind(account.disconnected_at)
        .bind(account.updated_at)
        .bind(&account.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hard delete; returns whether a row was removed
    pub async fn delete_account(&self, id: &str, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM social_accounts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_accounts(
        &self,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Account>, AppError> {
        debug_assert_eq!(query.table(), Table::Accounts);
        self.fetch_page::<AccountRow, Account>(query, page).await
    }

    /// All accounts matching an owner-scoped query, unpaginated
    pub async fn select_accounts(&self, query: &ListQuery) -> Result<Vec<Account>, AppError> {
        debug_assert_eq!(query.table(), Table::Accounts);
        self.fetch_all::<AccountRow, Account>(query.select(None))
            .await
    }

    pub async fn count_accounts(&self, query: &ListQuery) -> Result<i64, AppError> {
        debug_assert_eq!(query.table(), Table::Accounts);
        let count = query
            .count()
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Connected accounts of `user_id` among `ids`
    pub async fn connected_accounts_by_ids(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<Vec<Account>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM social_accounts WHERE user_id = ",
        );
        qb.push_bind(user_id.to_string())
            .push(" AND is_connected = 1 AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows: Vec<AccountRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        convert_rows(rows)
    }

    /// Per-platform account count, follower sum and post-count sum over
    /// connected accounts
    pub async fn account_platform_stats(
        &self,
        user_id: &str,
    ) -> Result<Vec<PlatformAccountStats>, AppError> {
        let query = ListQuery::for_owner(Table::Accounts, user_id).eq_bool("is_connected", true);
        let rows: Vec<(String, i64, i64, i64)> = query
            .grouped(
                "platform",
                "COUNT(*), COALESCE(SUM(followers_count), 0), COALESCE(SUM(posts_count), 0)",
            )
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(platform, accounts, followers, posts)| {
                Ok(PlatformAccountStats {
                    platform: platform.parse()?,
                    accounts,
                    followers,
                    posts,
                })
            })
            .collect()
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post, reconciling its status first
    pub async fn insert_post(&self, post: &mut Post) -> Result<(), AppError> {
        post.reconcile_status(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, user_id, title, content, media, platforms, status, scheduled_at,
                timezone, post_type, tags, location, link_preview, settings, analytics,
                notes, created_at, updated_at, published_at, is_deleted
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(Json(&post.media))
        .bind(Json(&post.platforms))
        .bind(post.status.as_str())
        .bind(post.scheduled_at)
        .bind(&post.timezone)
        .bind(post.post_type.as_str())
        .bind(Json(&post.tags))
        .bind(post.location.as_ref().map(Json))
        .bind(post.link_preview.as_ref().map(Json))
        .bind(Json(&post.settings))
        .bind(Json(&post.analytics))
        .bind(&post.notes)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.published_at)
        .bind(post.is_deleted)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a post, reconciling its status first
    ///
    /// The whole aggregate is one row, so the derived status is written
    /// atomically with the sub-records it was derived from.
    pub async fn save_post(&self, post: &mut Post) -> Result<(), AppError> {
        post.reconcile_status(Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE posts SET
                title = ?, content = ?, media = ?, platforms = ?, status = ?,
                scheduled_at = ?, timezone = ?, post_type = ?, tags = ?, location = ?,
                link_preview = ?, settings = ?, analytics = ?, notes = ?,
                updated_at = ?, published_at = ?, is_deleted = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(Json(&post.media))
        .bind(Json(&post.platforms))
        .bind(post.status.as_str())
        .bind(post.scheduled_at)
        .bind(&post.timezone)
        .bind(post.post_type.as_str())
        .bind(Json(&post.tags))
        .bind(post.location.as_ref().map(Json))
        .bind(post.link_preview.as_ref().map(Json))
        .bind(Json(&post.settings))
        .bind(Json(&post.analytics))
        .bind(&post.notes)
        .bind(post.updated_at)
        .bind(post.published_at)
        .bind(post.is_deleted)
        .bind(&post.id)
        .bind(&post.user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post"));
        }

        Ok(())
    }

    /// Get a live (non-deleted) post owned by `user_id`
    pub async fn get_post(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT * FROM posts WHERE id = ? AND user_id = ? AND is_deleted = 0",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Post::try_from).transpose()
    }

    /// Get a post owned by `user_id`, soft-deleted or not
    pub async fn get_post_including_deleted(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Post>, AppError> {
        let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    pub async fn list_posts(
        &self,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Post>, AppError> {
        debug_assert_eq!(query.table(), Table::Posts);
        self.fetch_page::<PostRow, Post>(query, page).await
    }

    /// Every post matching the query, in query order
    pub async fn select_posts(&self, query: &ListQuery) -> Result<Vec<Post>, AppError> {
        debug_assert_eq!(query.table(), Table::Posts);
        self.fetch_all::<PostRow, Post>(query.select(None)).await
    }

    /// First `limit` posts matching the query, in query order
    pub async fn select_first_posts(
        &self,
        query: &ListQuery,
        limit: i64,
    ) -> Result<Vec<Post>, AppError> {
        debug_assert_eq!(query.table(), Table::Posts);
        self.fetch_all::<PostRow, Post>(query.select_first(limit))
            .await
    }

    /// Post counts grouped by aggregate status
    pub async fn count_posts_by_status(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<(PostStatus, i64)>, AppError> {
        debug_assert_eq!(query.table(), Table::Posts);
        let rows: Vec<(String, i64)> = query
            .grouped("status", "COUNT(*)")
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(status, count)| Ok((status.parse()?, count)))
            .collect()
    }

    // =========================================================================
    // Media
    // =========================================================================

    pub async fn insert_media(&self, media: &Media) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO media (
                id, user_id, filename, original_name, media_type, mime_type, size, url,
                thumbnail, width, height, duration, alt_text, caption, tags, folder,
                is_used, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&media.id)
        .bind(&media.user_id)
        .bind(&media.filename)
        .bind(&media.original_name)
        .bind(media.media_type.as_str())
        .bind(&media.mime_type)
        .bind(media.size)
        .bind(&media.url)
        .bind(&media.thumbnail)
        .bind(media.dimensions.width.map(i64::from))
        .bind(media.dimensions.height.map(i64::from))
        .bind(media.duration)
        .bind(&media.alt_text)
        .bind(&media.caption)
        .bind(Json(&media.tags))
        .bind(&media.folder)
        .bind(media.is_used)
        .bind(media.created_at)
        .bind(media.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a media asset owned by `user_id`
    pub async fn get_media(&self, id: &str, user_id: &str) -> Result<Option<Media>, AppError> {
        let row = sqlx::query_as::<_, MediaRow>("SELECT * FROM media WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Media::try_from).transpose()
    }

    /// Update the user-editable metadata of a media asset
    pub async fn update_media(&self, media: &Media) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE media SET
                alt_text = ?, caption = ?, tags = ?, folder = ?, is_used = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&media.alt_text)
        .bind(&media.caption)
        .bind(Json(&media.tags))
        .bind(&media.folder)
        .bind(media.is_used)
        .bind(media.updated_at)
        .bind(&media.id)
        .bind(&media.user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_media(&self, id: &str, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM media WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_media(
        &self,
        query: &ListQuery,
        page: PageRequest,
    ) -> Result<Page<Media>, AppError> {
        debug_assert_eq!(query.table(), Table::Media);
        self.fetch_page::<MediaRow, Media>(query, page).await
    }

    /// Folder rollup for `user_id`, sorted by folder name
    pub async fn media_folder_summaries(
        &self,
        user_id: &str,
    ) -> Result<Vec<FolderSummary>, AppError> {
        let rows: Vec<(String, i64, i64)> = ListQuery::for_owner(Table::Media, user_id)
            .grouped("folder", "COUNT(*), COALESCE(SUM(size), 0)")
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, count, size)| FolderSummary { name, count, size })
            .collect())
    }

    // =========================================================================
    // Analytics snapshots
    // =========================================================================

    pub async fn get_analytics_report(
        &self,
        user_id: &str,
    ) -> Result<Option<AnalyticsReport>, AppError> {
        let report: Option<Json<AnalyticsReport>> =
            sqlx::query_scalar("SELECT report FROM analytics_snapshots WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(report.map(|r| r.0))
    }

    pub async fn upsert_analytics_report(
        &self,
        user_id: &str,
        report: &AnalyticsReport,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO analytics_snapshots (user_id, report, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                report = excluded.report,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(Json(report))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
