//! Session tokens
//!
//! HMAC-signed tokens carried as a bearer token or `session` cookie.
//! No server-side session storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Authenticated user session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Owner id used to scope every record
    pub user_id: String,
    pub email: String,
    /// IANA zone used as the default post timezone
    #[serde(default)]
    pub timezone: Option<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// New session valid for `max_age_secs` from now
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            email: email.into(),
            timezone: None,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Timezone for new posts, falling back to UTC
    pub fn timezone_or_utc(&self) -> String {
        self.timezone
            .as_deref()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or("UTC")
            .to_string()
    }
}

fn signer(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session key: {e}")))
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = signer(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// `Unauthorized` if the token is malformed, tampered with or expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let mut mac = signer(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let session: Session =
        serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn token_roundtrip_preserves_owner() {
        let mut session = Session::new("user-1", "user@example.com", 3600);
        session.timezone = Some("Europe/Berlin".to_string());

        let token = create_session_token(&session, SECRET).unwrap();
        let verified = verify_session_token(&token, SECRET).unwrap();

        assert_eq!(verified.user_id, "user-1");
        assert_eq!(verified.timezone_or_utc(), "Europe/Berlin");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let session = Session::new("user-1", "user@example.com", 3600);
        let token = create_session_token(&session, SECRET).unwrap();

        let forged = Session::new("user-2", "user@example.com", 3600);
        let forged_payload = create_session_token(&forged, SECRET).unwrap();
        let (payload, _) = forged_payload.split_once('.').unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let result = verify_session_token(&format!("{payload}.{signature}"), SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let session = Session::new("user-1", "user@example.com", 3600);
        let token = create_session_token(&session, SECRET).unwrap();

        let result = verify_session_token(&token, "another-secret-another-secret-xx");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let session = Session::new("user-1", "user@example.com", -10);
        let token = create_session_token(&session, SECRET).unwrap();

        assert!(matches!(
            verify_session_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn blank_timezone_falls_back_to_utc() {
        let mut session = Session::new("user-1", "user@example.com", 3600);
        session.timezone = Some("  ".to_string());
        assert_eq!(session.timezone_or_utc(), "UTC");
    }
}
