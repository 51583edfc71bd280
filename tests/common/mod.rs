//! Common test utilities for E2E tests

#![allow(dead_code)]

use serde_json::{Value, json};
use socialflow::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_USER: &str = "user-test";
pub const OTHER_USER: &str = "user-other";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database and uploads
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                cors_origins: vec![],
            },
            database: config::DatabaseConfig { path: db_path },
            storage: config::StorageConfig {
                media: config::MediaStorageConfig {
                    backend: config::MediaBackend::Local,
                    bucket: String::new(),
                    public_url: "/uploads".to_string(),
                    local_dir: temp_dir.path().join("uploads"),
                },
            },
            cloudflare: None,
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            uploads: config::UploadConfig {
                max_file_bytes: 1024 * 1024,
                max_files: 3,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        socialflow::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Same router as the binary
        let app = socialflow::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a signed session token for `user_id`
    pub fn create_test_token(&self, user_id: &str) -> String {
        use socialflow::auth::{Session, create_session_token};

        let session = Session::new(user_id, format!("{user_id}@example.com"), 3600);
        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }

    /// Connect a social account through the API and return its JSON
    pub async fn connect_account(&self, user_id: &str, platform: &str, platform_user_id: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/accounts/connect"))
            .bearer_auth(self.create_test_token(user_id))
            .json(&json!({
                "platform": platform,
                "name": "Test Page",
                "username": "testpage",
                "access_token": "access-token",
                "platform_user_id": platform_user_id,
            }))
            .send()
            .await
            .unwrap();
        assert!(
            response.status().is_success(),
            "connect failed: {}",
            response.status()
        );

        let body: Value = response.json().await.unwrap();
        body["data"]["account"].clone()
    }

    /// Create a post targeting one account and return its JSON
    pub async fn create_post(&self, user_id: &str, content: &str, platform: &str, account_id: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/posts"))
            .bearer_auth(self.create_test_token(user_id))
            .json(&json!({
                "content": content,
                "platforms": [{"platform": platform, "account_id": account_id}],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.unwrap();
        body["data"]["post"].clone()
    }
}
