//! Media object storage
//!
//! Handles:
//! - Cloudflare R2 (S3-compatible) buckets served from a custom domain
//! - A local directory for development and tests

mod local;
mod r2;

use async_trait::async_trait;

use crate::error::AppError;

pub use local::LocalMediaStore;
pub use r2::R2MediaStore;

/// Byte storage for uploaded media
///
/// Keys are relative paths such as `user/folder/01H....png`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `data` under `key` and return its public URL
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    /// Public URL for a key, whether or not it exists
    fn public_url(&self, key: &str) -> String;
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
