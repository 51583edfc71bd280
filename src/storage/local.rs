//! Media storage on the local filesystem
//!
//! Objects are written below a root directory and served by the HTTP
//! layer under the configured public URL prefix.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{MediaStore, join_url};
use crate::error::AppError;

pub struct LocalMediaStore {
    root: PathBuf,
    public_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    /// Resolve a key below the root, refusing anything that escapes it
    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe || key.is_empty() {
            return Err(AppError::Storage(format!("invalid object key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("failed to create media directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write media file: {e}")))?;

        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("failed to delete media file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_and_delete_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalMediaStore::new(temp_dir.path(), "/uploads");

        let url = store
            .put("user-1/summer/a.png", b"png-bytes".to_vec(), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "/uploads/user-1/summer/a.png");

        let path = temp_dir.path().join("user-1/summer/a.png");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png-bytes");

        store.delete("user-1/summer/a.png").await.unwrap();
        assert!(!path.exists());

        // Deleting again is not an error
        store.delete("user-1/summer/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalMediaStore::new(temp_dir.path(), "/uploads");

        let error = store
            .put("../outside.png", vec![1], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Storage(_)));
    }
}
