//! Request extractors whose rejections render as the error envelope

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `axum::Json` that fails with `AppError::Validation`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` that fails with `AppError::Validation`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        routing::post,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Draft {
        content: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        page: Option<i64>,
    }

    fn router() -> Router {
        Router::new().route(
            "/drafts",
            post(|ApiJson(draft): ApiJson<Draft>| async move { draft.content }).get(
                |ApiQuery(paging): ApiQuery<Paging>| async move {
                    paging.page.unwrap_or(1).to_string()
                },
            ),
        )
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn missing_json_field_is_a_validation_error() {
        let request = Request::post("/drafts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"no content"}"#))
            .unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("content"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let request = Request::post("/drafts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn bad_query_string_is_a_validation_error() {
        let request = Request::get("/drafts?page=abc").body(Body::empty()).unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn valid_input_passes_through() {
        let request = Request::get("/drafts?page=3").body(Body::empty()).unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"3");
    }
}
