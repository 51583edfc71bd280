//! Media library service
//!
//! Accepts uploads, stores the bytes in the configured [`MediaStore`] and
//! keeps the asset metadata in the database.

use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::UploadConfig;
use crate::data::query::MediaListParams;
use crate::data::{Database, Dimensions, EntityId, FolderSummary, Media, MediaType, Page};
use crate::error::AppError;
use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL};
use crate::storage::MediaStore;

pub const DEFAULT_FOLDER: &str = "uncategorized";

const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];
const ALLOWED_VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime", "video/x-msvideo"];

fn file_extension_from_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        _ => "bin",
    }
}

fn media_type_from_content_type(content_type: &str) -> MediaType {
    if content_type.starts_with("video/") {
        MediaType::Video
    } else if content_type == "image/gif" {
        MediaType::Gif
    } else {
        MediaType::Image
    }
}

/// Folder name as a single safe key segment
fn folder_key_segment(folder: &str) -> String {
    let segment: String = folder
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let segment = segment.trim_matches('-');
    if segment.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        segment.to_string()
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Raster images report their dimensions; SVG and video do not
fn read_dimensions(content_type: &str, data: &[u8]) -> Dimensions {
    if !content_type.starts_with("image/") || content_type == "image/svg+xml" {
        return Dimensions::default();
    }

    match image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.into_dimensions())
    {
        Ok((width, height)) => Dimensions {
            width: Some(width),
            height: Some(height),
        },
        Err(error) => {
            tracing::debug!(%error, content_type, "Could not read image dimensions");
            Dimensions::default()
        }
    }
}

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Metadata submitted alongside an upload
#[derive(Debug, Clone, Default)]
pub struct UploadMeta {
    pub folder: Option<String>,
    pub caption: Option<String>,
    /// Comma-separated
    pub tags: Option<String>,
    pub alt_text: Option<String>,
}

/// Editable media fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaPatch {
    pub caption: Option<String>,
    pub alt_text: Option<String>,
    pub folder: Option<String>,
    /// Comma-separated
    pub tags: Option<String>,
    pub is_used: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub original_name: String,
    pub message: String,
}

/// Result of a multi-file upload; each file succeeds or fails on its own
#[derive(Debug, Clone, Serialize)]
pub struct BulkUpload {
    pub uploaded: Vec<Media>,
    pub failed: Vec<FailedUpload>,
}

/// Media library service
pub struct MediaService {
    db: Arc<Database>,
    store: Arc<dyn MediaStore>,
    limits: UploadConfig,
}

impl MediaService {
    /// Create new media service
    pub fn new(db: Arc<Database>, store: Arc<dyn MediaStore>, limits: UploadConfig) -> Self {
        Self { db, store, limits }
    }

    /// One page of assets plus every folder the user has
    pub async fn list(
        &self,
        user_id: &str,
        params: MediaListParams,
    ) -> Result<(Page<Media>, Vec<String>), AppError> {
        let (query, page) = params.into_query(user_id)?;
        let media = self.db.list_media(&query, page).await?;
        let folders = self
            .db
            .media_folder_summaries(user_id)
            .await?
            .into_iter()
            .map(|f| f.name)
            .collect();
        Ok((media, folders))
    }

    pub async fn get(&self, id: &str, user_id: &str) -> Result<Media, AppError> {
        self.db
            .get_media(id, user_id)
            .await?
            .ok_or(AppError::NotFound("Media"))
    }

    fn validate_file(&self, file: &UploadFile) -> Result<(), AppError> {
        if file.data.is_empty() {
            return Err(AppError::Validation("No file uploaded".to_string()));
        }

        let content_type = file.content_type.as_str();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type) && !ALLOWED_VIDEO_TYPES.contains(&content_type)
        {
            return Err(AppError::Validation(
                "Invalid file type. Only images and videos are allowed.".to_string(),
            ));
        }

        if file.data.len() > self.limits.max_file_bytes {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {}MB.",
                self.limits.max_file_bytes / (1024 * 1024)
            )));
        }

        Ok(())
    }

    /// Store one file and record it in the library.
    ///
    /// The stored object is removed again if the database insert fails.
    pub async fn upload(
        &self,
        user_id: &str,
        file: UploadFile,
        meta: UploadMeta,
    ) -> Result<Media, AppError> {
        self.validate_file(&file)?;

        let folder = meta
            .folder
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FOLDER.to_string());

        let id = EntityId::new().0;
        let key = format!(
            "{}/{}/{}.{}",
            user_id,
            folder_key_segment(&folder),
            id,
            file_extension_from_content_type(&file.content_type)
        );
        let size = file.data.len();
        let dimensions = read_dimensions(&file.content_type, &file.data);

        let url = self.store.put(&key, file.data, &file.content_type).await?;

        let now = Utc::now();
        let media = Media {
            id,
            user_id: user_id.to_string(),
            filename: key,
            original_name: file.original_name,
            media_type: media_type_from_content_type(&file.content_type),
            mime_type: file.content_type,
            size: size as i64,
            thumbnail: Some(url.clone()),
            url,
            dimensions,
            duration: None,
            alt_text: meta.alt_text.unwrap_or_default(),
            caption: meta.caption.unwrap_or_default(),
            tags: meta.tags.as_deref().map(split_tags).unwrap_or_default(),
            folder,
            is_used: false,
            created_at: now,
            updated_at: now,
        };

        if let Err(error) = self.db.insert_media(&media).await {
            if let Err(cleanup_error) = self.store.delete(&media.filename).await {
                tracing::warn!(
                    key = %media.filename,
                    error = %cleanup_error,
                    "failed to remove stored object after database insert error"
                );
            }
            return Err(error);
        }

        MEDIA_UPLOADS_TOTAL.inc();
        MEDIA_BYTES_UPLOADED.inc_by(size as f64);
        tracing::info!(media_id = %media.id, size, mime_type = %media.mime_type, "Media uploaded");
        Ok(media)
    }

    /// Upload several files into one folder, independently of each other
    pub async fn upload_many(
        &self,
        user_id: &str,
        files: Vec<UploadFile>,
        folder: Option<String>,
    ) -> Result<BulkUpload, AppError> {
        if files.is_empty() {
            return Err(AppError::Validation("No files uploaded".to_string()));
        }
        if files.len() > self.limits.max_files {
            return Err(AppError::Validation(format!(
                "Too many files. Maximum is {} files.",
                self.limits.max_files
            )));
        }

        let mut result = BulkUpload {
            uploaded: Vec::with_capacity(files.len()),
            failed: Vec::new(),
        };
        let mut first_error = None;

        for file in files {
            let original_name = file.original_name.clone();
            let meta = UploadMeta {
                folder: folder.clone(),
                ..Default::default()
            };

            match self.upload(user_id, file, meta).await {
                Ok(media) => result.uploaded.push(media),
                Err(error) => {
                    tracing::warn!(file = %original_name, %error, "Skipping failed upload");
                    result.failed.push(FailedUpload {
                        original_name,
                        message: error.public_message(),
                    });
                    first_error.get_or_insert(error);
                }
            }
        }

        // Nothing stored: answer with the first failure as it was raised
        if let Some(error) = first_error.filter(|_| result.uploaded.is_empty()) {
            return Err(error);
        }

        Ok(result)
    }

    pub async fn update(&self, id: &str, user_id: &str, patch: MediaPatch) -> Result<Media, AppError> {
        let mut media = self.get(id, user_id).await?;

        if let Some(caption) = patch.caption {
            media.caption = caption;
        }
        if let Some(alt_text) = patch.alt_text {
            media.alt_text = alt_text;
        }
        if let Some(folder) = patch.folder {
            let folder = folder.trim();
            media.folder = if folder.is_empty() {
                DEFAULT_FOLDER.to_string()
            } else {
                folder.to_string()
            };
        }
        if let Some(tags) = patch.tags {
            media.tags = split_tags(&tags);
        }
        if let Some(is_used) = patch.is_used {
            media.is_used = is_used;
        }
        media.updated_at = Utc::now();

        self.db.update_media(&media).await?;
        Ok(media)
    }

    /// Remove the asset. A failing object delete is logged and the record
    /// is removed anyway; posts keep their embedded copies.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let media = self.get(id, user_id).await?;

        if let Err(error) = self.store.delete(&media.filename).await {
            tracing::warn!(key = %media.filename, %error, "Failed to delete stored media object");
        }

        self.db.delete_media(&media.id, user_id).await?;
        Ok(())
    }

    pub async fn folders(&self, user_id: &str) -> Result<Vec<FolderSummary>, AppError> {
        self.db.media_folder_summaries(user_id).await
    }

    /// Folders exist implicitly; this only validates and normalizes a name
    pub fn create_folder(&self, name: Option<&str>) -> Result<String, AppError> {
        name.map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| AppError::Validation("Folder name is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalMediaStore, MockMediaStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn create_service(max_file_bytes: usize) -> (MediaService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("service-media.db"))
            .await
            .unwrap();
        let store = LocalMediaStore::new(temp_dir.path().join("uploads"), "/uploads");
        let service = MediaService::new(
            Arc::new(db),
            Arc::new(store),
            UploadConfig {
                max_file_bytes,
                max_files: 3,
            },
        );
        (service, temp_dir)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::new(width, height);
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn png_file(name: &str) -> UploadFile {
        UploadFile {
            original_name: name.to_string(),
            content_type: "image/png".to_string(),
            data: png_bytes(4, 3),
        }
    }

    #[tokio::test]
    async fn upload_stores_bytes_and_reads_dimensions() {
        let (service, temp_dir) = create_service(1024 * 1024).await;

        let media = service
            .upload(
                "user-1",
                png_file("Banner.png"),
                UploadMeta {
                    folder: Some("Summer Launch".to_string()),
                    tags: Some("summer, launch ,,".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(media.media_type, MediaType::Image);
        assert_eq!(media.folder, "Summer Launch");
        assert_eq!(media.tags, vec!["summer".to_string(), "launch".to_string()]);
        assert_eq!(media.dimensions.width, Some(4));
        assert_eq!(media.dimensions.height, Some(3));
        assert!(media.filename.starts_with("user-1/summer-launch/"));
        assert!(media.url.starts_with("/uploads/user-1/summer-launch/"));
        assert!(temp_dir.path().join("uploads").join(&media.filename).exists());
    }

    #[tokio::test]
    async fn upload_rejects_unknown_types_and_oversized_files() {
        let (service, _temp_dir) = create_service(16).await;

        let pdf = UploadFile {
            original_name: "doc.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![1, 2, 3],
        };
        assert!(matches!(
            service.upload("user-1", pdf, UploadMeta::default()).await,
            Err(AppError::Validation(message)) if message.contains("Invalid file type")
        ));

        assert!(matches!(
            service.upload("user-1", png_file("big.png"), UploadMeta::default()).await,
            Err(AppError::Validation(message)) if message.contains("File too large")
        ));
    }

    #[tokio::test]
    async fn upload_many_is_best_effort() {
        let (service, _temp_dir) = create_service(1024 * 1024).await;

        let bad = UploadFile {
            original_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: b"hello".to_vec(),
        };
        let result = service
            .upload_many("user-1", vec![png_file("a.png"), bad], None)
            .await
            .unwrap();

        assert_eq!(result.uploaded.len(), 1);
        assert_eq!(result.uploaded[0].folder, DEFAULT_FOLDER);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].original_name, "notes.txt");

        let too_many = (0..4).map(|i| png_file(&format!("{i}.png"))).collect();
        assert!(service.upload_many("user-1", too_many, None).await.is_err());
    }

    async fn create_service_with_store(store: MockMediaStore) -> (MediaService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("service-media.db"))
            .await
            .unwrap();
        let service = MediaService::new(
            Arc::new(db),
            Arc::new(store),
            UploadConfig {
                max_file_bytes: 1024 * 1024,
                max_files: 3,
            },
        );
        (service, temp_dir)
    }

    #[tokio::test]
    async fn upload_many_keeps_store_failures_as_server_errors() {
        let mut store = MockMediaStore::new();
        store
            .expect_put()
            .returning(|_, _, _| Err(AppError::Storage("permission denied: /srv/uploads".to_string())));
        let (service, _temp_dir) = create_service_with_store(store).await;

        let error = service
            .upload_many("user-1", vec![png_file("a.png"), png_file("b.png")], None)
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::Storage(_)));
        assert_eq!(error.public_message(), "Storage error");
    }

    #[tokio::test]
    async fn upload_many_reports_partial_store_failures_generically() {
        let calls = AtomicUsize::new(0);
        let mut store = MockMediaStore::new();
        store.expect_put().returning(move |key, _, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(format!("/uploads/{key}"))
            } else {
                Err(AppError::Storage("disk quota exceeded on /srv".to_string()))
            }
        });
        let (service, _temp_dir) = create_service_with_store(store).await;

        let result = service
            .upload_many("user-1", vec![png_file("a.png"), png_file("b.png")], None)
            .await
            .unwrap();

        assert_eq!(result.uploaded.len(), 1);
        assert_eq!(result.failed[0].original_name, "b.png");
        assert_eq!(result.failed[0].message, "Storage error");
    }

    #[tokio::test]
    async fn delete_removes_object_and_record() {
        let (service, temp_dir) = create_service(1024 * 1024).await;
        let media = service
            .upload("user-1", png_file("a.png"), UploadMeta::default())
            .await
            .unwrap();

        assert!(matches!(
            service.delete(&media.id, "user-2").await,
            Err(AppError::NotFound("Media"))
        ));
        service.delete(&media.id, "user-1").await.unwrap();

        assert!(!temp_dir.path().join("uploads").join(&media.filename).exists());
        assert!(service.get(&media.id, "user-1").await.is_err());
    }

    #[tokio::test]
    async fn update_and_folder_rollup() {
        let (service, _temp_dir) = create_service(1024 * 1024).await;
        let media = service
            .upload("user-1", png_file("a.png"), UploadMeta::default())
            .await
            .unwrap();

        let updated = service
            .update(
                &media.id,
                "user-1",
                MediaPatch {
                    folder: Some("campaigns".to_string()),
                    tags: Some("q3,ads".to_string()),
                    is_used: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tags, vec!["q3".to_string(), "ads".to_string()]);
        assert!(updated.is_used);

        let folders = service.folders("user-1").await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "campaigns");
        assert_eq!(folders[0].count, 1);
        assert_eq!(folders[0].size, media.size);
    }

    #[tokio::test]
    async fn create_folder_requires_a_name() {
        let (service, _temp_dir) = create_service(1024).await;
        assert!(service.create_folder(Some("   ")).is_err());
        assert!(service.create_folder(None).is_err());
        assert_eq!(service.create_folder(Some(" drafts ")).unwrap(), "drafts");
    }

    #[test]
    fn folder_segments_are_key_safe() {
        assert_eq!(folder_key_segment("../etc"), "etc");
        assert_eq!(folder_key_segment("Spring 2025!"), "spring-2025");
        assert_eq!(folder_key_segment("///"), DEFAULT_FOLDER);
    }
}
