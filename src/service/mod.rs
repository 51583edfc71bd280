//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the database, media storage and publish dispatch.

mod account;
mod analytics;
pub mod dispatch;
pub mod estimate;
mod media;
mod post;

pub use account::{AccountService, ConnectAccount, Connection};
pub use analytics::{
    AnalyticsService, BestTime, Dashboard, ExportRow, PlatformReport, PostReport,
};
pub use dispatch::{LoggingDispatcher, PublishDispatcher};
pub use estimate::{EngagementEstimator, SyntheticEngagement};
pub use media::{BulkUpload, MediaPatch, MediaService, UploadFile, UploadMeta};
pub use post::{CreatePost, PostService, UpdatePost, parse_schedule_time};
