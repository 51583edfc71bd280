//! Response envelope
//!
//! Every successful API response is `{"success": true, "message"?, "data"?}`.
//! Failures use the same shape with `success: false`, see [`crate::error`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Successful API response with its HTTP status
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    envelope: Envelope,
}

impl ApiResponse {
    /// 200 with a data object
    pub fn ok(data: serde_json::Value) -> Self {
        Self::with_status(StatusCode::OK, Some(data))
    }

    /// 201 with a data object
    pub fn created(data: serde_json::Value) -> Self {
        Self::with_status(StatusCode::CREATED, Some(data))
    }

    /// 200 carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, None).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.envelope.message = Some(message.into());
        self
    }

    fn with_status(status: StatusCode, data: Option<serde_json::Value>) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: true,
                message: None,
                data,
            },
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_only_response_omits_data() {
        let response = ApiResponse::message("Post deleted successfully");
        let body = serde_json::to_value(&response.envelope).unwrap();
        assert_eq!(
            body,
            json!({"success": true, "message": "Post deleted successfully"})
        );
        assert_eq!(response.status, StatusCode::OK);
    }

    #[test]
    fn created_response_carries_data() {
        let response = ApiResponse::created(json!({"post": {"id": "p1"}}))
            .with_message("Post created successfully");
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.envelope.data, Some(json!({"post": {"id": "p1"}})));
    }
}
