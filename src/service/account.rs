//! Social account service
//!
//! Connect, reconnect, disconnect and maintain the social profiles a user
//! publishes to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data::query::AccountListParams;
use crate::data::{
    Account, AccountSettings, AccountSettingsPatch, AccountType, Database, EntityId, Page,
    Platform, PlatformAccountStats,
};
use crate::error::AppError;
use crate::metrics::ACCOUNT_CONNECTIONS_TOTAL;

/// Profile and credentials handed over by a platform's OAuth flow
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectAccount {
    pub platform: Platform,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,
    pub platform_user_id: String,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub page_access_token: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub account_type: Option<AccountType>,
}

impl ConnectAccount {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Account name is required".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        if self.access_token.is_empty() {
            return Err(AppError::Validation("Access token is required".to_string()));
        }
        if self.platform_user_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Platform user ID is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether a connect created a new account or refreshed an existing one
#[derive(Debug, Clone)]
pub enum Connection {
    Created(Account),
    Reconnected(Account),
}

/// Social account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        user_id: &str,
        params: AccountListParams,
    ) -> Result<Page<Account>, AppError> {
        let (query, page) = params.into_query(user_id)?;
        self.db.list_accounts(&query, page).await
    }

    /// Get an account owned by the user
    pub async fn get(&self, id: &str, user_id: &str) -> Result<Account, AppError> {
        self.db
            .get_account(id, user_id)
            .await?
            .ok_or(AppError::NotFound("Account"))
    }

    /// Connect a platform identity, or reconnect it if it is already known.
    ///
    /// A reconnect updates the existing row in place and moves it to the
    /// connecting user.
    pub async fn connect(&self, user_id: &str, input: ConnectAccount) -> Result<Connection, AppError> {
        input.validate()?;
        let now = Utc::now();

        if let Some(mut account) = self
            .db
            .find_account_by_identity(input.platform, &input.platform_user_id)
            .await?
        {
            account.user_id = user_id.to_string();
            account.name = input.name;
            account.username = input.username;
            account.profile_picture = input.profile_picture;
            account.access_token = Some(input.access_token);
            account.refresh_token = input.refresh_token;
            account.token_expires_at = input.token_expires_at;
            account.page_id = input.page_id;
            account.page_access_token = input.page_access_token;
            account.permissions = input.permissions;
            account.account_type = input.account_type.unwrap_or_default();
            account.is_connected = true;
            account.connected_at = now;
            account.disconnected_at = None;
            account.updated_at = now;

            self.db.update_account(&account).await?;
            ACCOUNT_CONNECTIONS_TOTAL
                .with_label_values(&["reconnected"])
                .inc();
            tracing::info!(
                account_id = %account.id,
                platform = %account.platform,
                "Social account reconnected"
            );
            return Ok(Connection::Reconnected(account));
        }

        let account = Account {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            platform: input.platform,
            account_type: input.account_type.unwrap_or_default(),
            name: input.name,
            username: input.username,
            profile_picture: input.profile_picture,
            cover_image: None,
            bio: String::new(),
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            is_connected: true,
            is_active: true,
            access_token: Some(input.access_token),
            refresh_token: input.refresh_token,
            token_expires_at: input.token_expires_at,
            platform_user_id: input.platform_user_id,
            page_id: input.page_id,
            page_access_token: input.page_access_token,
            permissions: input.permissions,
            settings: AccountSettings::default(),
            last_synced_at: now,
            connected_at: now,
            disconnected_at: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_account(&account).await?;
        ACCOUNT_CONNECTIONS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            account_id = %account.id,
            platform = %account.platform,
            "Social account connected"
        );
        Ok(Connection::Created(account))
    }

    /// Soft-disable: credentials are cleared, the account stays listed
    pub async fn disconnect(&self, id: &str, user_id: &str) -> Result<Account, AppError> {
        let mut account = self.get(id, user_id).await?;
        account.disconnect(Utc::now());
        self.db.update_account(&account).await?;

        tracing::info!(account_id = %account.id, "Social account disconnected");
        Ok(account)
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        if !self.db.delete_account(id, user_id).await? {
            return Err(AppError::NotFound("Account"));
        }
        tracing::info!(account_id = %id, "Social account deleted");
        Ok(())
    }

    /// Merge the provided settings keys over the stored ones
    pub async fn update_settings(
        &self,
        id: &str,
        user_id: &str,
        patch: AccountSettingsPatch,
    ) -> Result<Account, AppError> {
        let mut account = self.get(id, user_id).await?;
        account.settings.apply(patch);
        account.updated_at = Utc::now();
        self.db.update_account(&account).await?;
        Ok(account)
    }

    /// Acknowledge a token refresh request.
    ///
    /// TODO: exchange `refresh_token` with the platform's OAuth endpoint.
    pub async fn refresh_token(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let account = self.get(id, user_id).await?;
        tracing::info!(
            account_id = %account.id,
            platform = %account.platform,
            "Token refresh requested"
        );
        Ok(())
    }

    /// Stamp `last_synced_at`; profile data is not fetched yet
    pub async fn sync(&self, id: &str, user_id: &str) -> Result<Account, AppError> {
        let mut account = self.get(id, user_id).await?;
        let now = Utc::now();
        account.last_synced_at = now;
        account.updated_at = now;
        self.db.update_account(&account).await?;
        Ok(account)
    }

    pub async fn platform_stats(&self, user_id: &str) -> Result<Vec<PlatformAccountStats>, AppError> {
        self.db.account_platform_stats(user_id).await
    }
}
