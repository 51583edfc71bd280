//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    /// Only required for the R2 media backend
    #[serde(default)]
    pub cloudflare: Option<CloudflareConfig>,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub media: MediaStorageConfig,
}

/// Where uploaded media bytes go
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    #[default]
    Local,
    R2,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaStorageConfig {
    #[serde(default)]
    pub backend: MediaBackend,
    /// R2 bucket name for media
    #[serde(default)]
    pub bucket: String,
    /// Public URL prefix for stored objects
    /// e.g., "https://media.example.com" for R2, "/uploads" for local
    pub public_url: String,
    /// Root directory for the local backend
    pub local_dir: PathBuf,
}

/// Cloudflare credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// R2 access key ID
    pub r2_access_key_id: String,
    /// R2 secret access key
    pub r2_secret_access_key: String,
}

/// Session verification settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Upload limits
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of one file in bytes (default: 100 MiB)
    pub max_file_bytes: usize,
    /// Maximum number of files in one multi-upload (default: 10)
    pub max_files: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SOCIALFLOW__SECTION__KEY)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/socialflow.db")?
            .set_default("storage.media.backend", "local")?
            .set_default("storage.media.public_url", "/uploads")?
            .set_default("storage.media.local_dir", "data/uploads")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("uploads.max_file_bytes", 100 * 1024 * 1024)?
            .set_default("uploads.max_files", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (SOCIALFLOW__*)
            .add_source(
                Environment::with_prefix("SOCIALFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.uploads.max_file_bytes == 0 || self.uploads.max_files == 0 {
            return Err(crate::error::AppError::Config(
                "uploads.max_file_bytes and uploads.max_files must be greater than 0".to_string(),
            ));
        }

        if self.storage.media.backend == MediaBackend::R2 {
            if self.cloudflare.is_none() {
                return Err(crate::error::AppError::Config(
                    "cloudflare credentials are required when storage.media.backend=r2"
                        .to_string(),
                ));
            }
            if self.storage.media.bucket.trim().is_empty() {
                return Err(crate::error::AppError::Config(
                    "storage.media.bucket is required when storage.media.backend=r2".to_string(),
                ));
            }
            url::Url::parse(&self.storage.media.public_url).map_err(|e| {
                crate::error::AppError::Config(format!(
                    "storage.media.public_url must be an absolute URL for the r2 backend: {e}"
                ))
            })?;
        }

        for origin in &self.server.cors_origins {
            let parsed = url::Url::parse(origin).map_err(|e| {
                crate::error::AppError::Config(format!("invalid CORS origin {origin}: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(crate::error::AppError::Config(format!(
                    "CORS origin must use http or https: {origin}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec![],
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/socialflow-test.db"),
            },
            storage: StorageConfig {
                media: MediaStorageConfig {
                    backend: MediaBackend::Local,
                    bucket: String::new(),
                    public_url: "/uploads".to_string(),
                    local_dir: PathBuf::from("/tmp/socialflow-uploads"),
                },
            },
            cloudflare: None,
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 604_800,
            },
            uploads: UploadConfig {
                max_file_bytes: 100 * 1024 * 1024,
                max_files: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_local_backend_without_cloudflare() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_requires_credentials_for_r2() {
        let mut config = valid_config();
        config.storage.media.backend = MediaBackend::R2;
        config.storage.media.bucket = "media".to_string();
        config.storage.media.public_url = "https://media.example.com".to_string();

        let error = config
            .validate()
            .expect_err("r2 backend without credentials must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("cloudflare")
        ));

        config.cloudflare = Some(CloudflareConfig {
            account_id: "account".to_string(),
            r2_access_key_id: "access-key".to_string(),
            r2_secret_access_key: "secret-key".to_string(),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_upload_limits() {
        let mut config = valid_config();
        config.uploads.max_files = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_checks_cors_origins() {
        let mut config = valid_config();
        config.server.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(config.validate().is_ok());

        config.server.cors_origins = vec!["app.example.com".to_string()];
        assert!(config.validate().is_err());
    }
}
