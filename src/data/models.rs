//! Data models
//!
//! Rust structs representing stored entities and their embedded documents.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Text enums
// =============================================================================

/// Declares a closed set of lowercase string values shared by the wire
/// format and the TEXT columns that store them.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::Validation(format!(
                        "invalid {}: {}",
                        $label, other
                    ))),
                }
            }
        }
    };
}

text_enum! {
    /// Supported social networks
    Platform("platform") {
        Facebook => "facebook",
        Instagram => "instagram",
        Twitter => "twitter",
        Linkedin => "linkedin",
        Youtube => "youtube",
        Tiktok => "tiktok",
        Pinterest => "pinterest",
    }
}

text_enum! {
    AccountType("account type") {
        Personal => "personal",
        Business => "business",
        Creator => "creator",
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Personal
    }
}

text_enum! {
    /// Preferred publishing format for an account
    PostFormat("post format") {
        Standard => "standard",
        Story => "story",
        Reel => "reel",
        Carousel => "carousel",
    }
}

impl Default for PostFormat {
    fn default() -> Self {
        PostFormat::Standard
    }
}

text_enum! {
    /// Aggregate status stored on a post
    PostStatus("status") {
        Draft => "draft",
        Scheduled => "scheduled",
        Publishing => "publishing",
        Published => "published",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

text_enum! {
    /// Status of one per-platform publication attempt
    PlatformStatus("platform status") {
        Pending => "pending",
        Scheduled => "scheduled",
        Publishing => "publishing",
        Published => "published",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl Default for PlatformStatus {
    fn default() -> Self {
        PlatformStatus::Pending
    }
}

text_enum! {
    PostType("post type") {
        Post => "post",
        Story => "story",
        Reel => "reel",
        Video => "video",
        Carousel => "carousel",
        Poll => "poll",
    }
}

impl Default for PostType {
    fn default() -> Self {
        PostType::Post
    }
}

text_enum! {
    TargetAudience("target audience") {
        Public => "public",
        Followers => "followers",
        Custom => "custom",
    }
}

impl Default for TargetAudience {
    fn default() -> Self {
        TargetAudience::Public
    }
}

text_enum! {
    /// Kind of media embedded in a post
    PostMediaType("post media type") {
        Image => "image",
        Video => "video",
        Gif => "gif",
        Carousel => "carousel",
    }
}

text_enum! {
    /// Kind of media asset in the library
    MediaType("media type") {
        Image => "image",
        Video => "video",
        Gif => "gif",
        Audio => "audio",
        Document => "document",
    }
}

// =============================================================================
// Social Account
// =============================================================================

/// A social profile connected by a user
///
/// Credentials are accepted on input but never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub platform: Platform,
    pub account_type: AccountType,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub cover_image: Option<String>,
    pub bio: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_connected: bool,
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub platform_user_id: String,
    pub page_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub page_access_token: Option<String>,
    pub permissions: Vec<String>,
    pub settings: AccountSettings,
    pub last_synced_at: DateTime<Utc>,
    pub connected_at: DateTime<Utc>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Soft-disable: credentials are dropped, the row stays
    pub fn disconnect(&mut self, now: DateTime<Utc>) {
        self.is_connected = false;
        self.disconnected_at = Some(now);
        self.access_token = None;
        self.refresh_token = None;
        self.page_access_token = None;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub auto_publish: bool,
    pub default_hashtags: Vec<String>,
    pub post_format: PostFormat,
    pub best_time_to_post: BestTimeToPost,
}

impl AccountSettings {
    /// Shallow merge: only the provided keys replace existing values
    pub fn apply(&mut self, patch: AccountSettingsPatch) {
        if let Some(auto_publish) = patch.auto_publish {
            self.auto_publish = auto_publish;
        }
        if let Some(default_hashtags) = patch.default_hashtags {
            self.default_hashtags = default_hashtags;
        }
        if let Some(post_format) = patch.post_format {
            self.post_format = post_format;
        }
        if let Some(best_time_to_post) = patch.best_time_to_post {
            self.best_time_to_post = best_time_to_post;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountSettingsPatch {
    pub auto_publish: Option<bool>,
    pub default_hashtags: Option<Vec<String>>,
    pub post_format: Option<PostFormat>,
    pub best_time_to_post: Option<BestTimeToPost>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BestTimeToPost {
    pub enabled: bool,
    pub time_slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub hour: u8,
    pub minute: u8,
}

/// Per-platform rollup of a user's connected accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformAccountStats {
    pub platform: Platform,
    pub accounts: i64,
    pub followers: i64,
    pub posts: i64,
}

// =============================================================================
// Post
// =============================================================================

/// A composed post plus one sub-record per target platform
///
/// `status` is derived from the sub-records on every persist,
/// see `data::lifecycle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub media: Vec<PostMedia>,
    pub platforms: Vec<PlatformPost>,
    pub status: PostStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub timezone: String,
    pub post_type: PostType,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub link_preview: Option<LinkPreview>,
    pub settings: PostSettings,
    pub analytics: PostAnalytics,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

/// Media embedded in a post by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMedia {
    pub media_type: PostMediaType,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One per-platform publication attempt, owned by its post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPost {
    pub platform: Platform,
    pub account_id: String,
    #[serde(default)]
    pub status: PlatformStatus,
    #[serde(default)]
    pub platform_post_id: Option<String>,
    #[serde(default)]
    pub post_url: Option<String>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: i32,
    #[serde(default)]
    pub engagement: Engagement,
}

impl PlatformPost {
    /// Fresh target with zeroed counters
    pub fn target(platform: Platform, account_id: String, status: PlatformStatus) -> Self {
        Self {
            platform,
            account_id,
            status,
            platform_post_id: None,
            post_url: None,
            posted_at: None,
            error_message: None,
            retry_count: 0,
            engagement: Engagement::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Engagement {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub views: i64,
    pub clicks: i64,
    pub reach: i64,
    pub impressions: i64,
}

impl Engagement {
    /// likes + comments + shares
    pub fn interactions(&self) -> i64 {
        self.likes + self.comments + self.shares
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub allow_comments: bool,
    pub allow_sharing: bool,
    pub target_audience: TargetAudience,
    pub sponsor_tagged: bool,
    pub sponsor_info: Option<SponsorInfo>,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            allow_comments: true,
            allow_sharing: true,
            target_audience: TargetAudience::Public,
            sponsor_tagged: false,
            sponsor_info: None,
        }
    }
}

impl PostSettings {
    /// Merge the provided keys over the current settings
    pub fn apply(&mut self, patch: PostSettingsPatch) {
        if let Some(allow_comments) = patch.allow_comments {
            self.allow_comments = allow_comments;
        }
        if let Some(allow_sharing) = patch.allow_sharing {
            self.allow_sharing = allow_sharing;
        }
        if let Some(target_audience) = patch.target_audience {
            self.target_audience = target_audience;
        }
        if let Some(sponsor_tagged) = patch.sponsor_tagged {
            self.sponsor_tagged = sponsor_tagged;
        }
        if let Some(sponsor_info) = patch.sponsor_info {
            self.sponsor_info = Some(sponsor_info);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostSettingsPatch {
    pub allow_comments: Option<bool>,
    pub allow_sharing: Option<bool>,
    pub target_audience: Option<TargetAudience>,
    pub sponsor_tagged: Option<bool>,
    pub sponsor_info: Option<SponsorInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorInfo {
    pub name: String,
    #[serde(default)]
    pub brand_id: Option<String>,
}

/// Stored engagement rollup for a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostAnalytics {
    pub total_engagement: i64,
    pub total_reach: i64,
    pub total_impressions: i64,
    pub total_clicks: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub place_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPreview {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Result reported back by a delivery pipeline for one platform target
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Published {
        platform_post_id: Option<String>,
        post_url: Option<String>,
    },
    Failed {
        error: String,
    },
}

// =============================================================================
// Media
// =============================================================================

/// Uploaded asset metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    pub user_id: String,
    /// Object key in the media store
    pub filename: String,
    pub original_name: String,
    pub media_type: MediaType,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub thumbnail: Option<String>,
    pub dimensions: Dimensions,
    pub duration: Option<f64>,
    pub alt_text: String,
    pub caption: String,
    pub tags: Vec<String>,
    pub folder: String,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Folder rollup: number of assets and total bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub name: String,
    pub count: i64,
    pub size: i64,
}

// =============================================================================
// Analytics snapshot
// =============================================================================

/// Stored per-user rollup document
///
/// Derived reporting data only; posts and accounts stay authoritative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsReport {
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub overall: OverallMetrics,
    pub by_platform: Vec<PlatformMetrics>,
    pub content_performance: Vec<ContentPerformance>,
    pub audience_demographics: AudienceDemographics,
    pub growth_trend: Vec<GrowthPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverallMetrics {
    pub total_posts: i64,
    pub total_engagement: i64,
    pub total_reach: i64,
    pub total_impressions: i64,
    pub avg_engagement_rate: f64,
    pub follower_growth: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub platform: Platform,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub total_posts: i64,
    #[serde(default)]
    pub total_engagement: i64,
    #[serde(default)]
    pub avg_engagement_rate: f64,
    #[serde(default)]
    pub total_reach: i64,
    #[serde(default)]
    pub total_followers: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPerformance {
    pub post_type: PostType,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceDemographics {
    pub age_groups: Vec<Bucket>,
    pub genders: Vec<Bucket>,
    pub locations: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub date: String,
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub engagement: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip_through_their_wire_names() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), *platform);
        }
        assert_eq!(
            serde_json::to_string(&PlatformStatus::Publishing).unwrap(),
            "\"publishing\""
        );
    }

    #[test]
    fn unknown_enum_value_is_a_validation_error() {
        let error = "myspace".parse::<Platform>().unwrap_err();
        assert!(matches!(error, AppError::Validation(message) if message.contains("myspace")));
    }

    #[test]
    fn account_credentials_are_never_serialized() {
        let now = Utc::now();
        let account = Account {
            id: EntityId::new().0,
            user_id: "user-1".to_string(),
            platform: Platform::Facebook,
            account_type: AccountType::Business,
            name: "Shop".to_string(),
            username: "shop".to_string(),
            profile_picture: None,
            cover_image: None,
            bio: String::new(),
            followers_count: 10,
            following_count: 0,
            posts_count: 0,
            is_connected: true,
            is_active: true,
            access_token: Some("secret-access".to_string()),
            refresh_token: Some("secret-refresh".to_string()),
            token_expires_at: None,
            platform_user_id: "fb-1".to_string(),
            page_id: Some("page".to_string()),
            page_access_token: Some("secret-page".to_string()),
            permissions: vec![],
            settings: AccountSettings::default(),
            last_synced_at: now,
            connected_at: now,
            disconnected_at: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret-"));
        assert!(!json.contains("access_token"));
    }

    #[test]
    fn settings_patch_only_touches_provided_keys() {
        let mut settings = PostSettings::default();
        settings.apply(PostSettingsPatch {
            allow_comments: Some(false),
            ..Default::default()
        });

        assert!(!settings.allow_comments);
        assert!(settings.allow_sharing);
        assert_eq!(settings.target_audience, TargetAudience::Public);
    }

    #[test]
    fn delivery_outcome_is_tagged() {
        let outcome: DeliveryOutcome =
            serde_json::from_str(r#"{"outcome":"failed","error":"rate limited"}"#).unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                error: "rate limited".to_string()
            }
        );
    }
}
