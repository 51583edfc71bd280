//! E2E tests for the post lifecycle

mod common;

use common::{OTHER_USER, TEST_USER, TestServer};
use serde_json::{Value, json};

#[tokio::test]
async fn test_create_publish_and_edit_lock() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "facebook", "fb-1").await;
    let account_id = account["id"].as_str().unwrap();

    let post = server
        .create_post(TEST_USER, "Hello", "facebook", account_id)
        .await;
    assert_eq!(post["status"], "draft");
    assert_eq!(post["platforms"][0]["status"], "pending");
    let id = post["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/api/posts/{id}/publish")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["post"]["status"], "publishing");
    assert_eq!(body["data"]["post"]["platforms"][0]["status"], "publishing");

    let stored: Value = server
        .client
        .get(server.url(&format!("/api/posts/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["data"]["post"]["status"], "publishing");
    assert!(stored["data"]["post"]["published_at"].is_null());
}

#[tokio::test]
async fn test_create_rejects_empty_content() {
    let server = TestServer::new().await;
    let account = server.connect_account(TEST_USER, "facebook", "fb-1").await;

    let response = server
        .client
        .post(server.url("/api/posts"))
        .bearer_auth(server.create_test_token(TEST_USER))
        .json(&json!({
            "content": "   ",
            "platforms": [{"platform": "facebook", "account_id": account["id"]}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Content is required");
}

#[tokio::test]
async fn test_create_without_content_field_is_bad_request() {
    let server = TestServer::new().await;
    let account = server.connect_account(TEST_USER, "facebook", "fb-1").await;

    let response = server
        .client
        .post(server.url("/api/posts"))
        .bearer_auth(server.create_test_token(TEST_USER))
        .json(&json!({
            "platforms": [{"platform": "facebook", "account_id": account["id"]}],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("content"));
}

#[tokio::test]
async fn test_listing_rejects_non_numeric_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/posts?page=abc"))
        .bearer_auth(server.create_test_token(TEST_USER))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_rejects_foreign_or_mismatched_accounts() {
    let server = TestServer::new().await;
    let foreign = server.connect_account(OTHER_USER, "facebook", "fb-9").await;
    let own = server.connect_account(TEST_USER, "twitter", "tw-1").await;
    let token = server.create_test_token(TEST_USER);

    for (platform, account_id) in [
        ("facebook", foreign["id"].as_str().unwrap()),
        ("facebook", own["id"].as_str().unwrap()),
    ] {
        let response = server
            .client
            .post(server.url("/api/posts"))
            .bearer_auth(&token)
            .json(&json!({
                "content": "Hello",
                "platforms": [{"platform": platform, "account_id": account_id}],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["message"],
            "One or more social accounts are invalid or disconnected"
        );
    }
}

#[tokio::test]
async fn test_schedule_then_cancel() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "linkedin", "li-1").await;
    let post = server
        .create_post(TEST_USER, "Launch day", "linkedin", account["id"].as_str().unwrap())
        .await;
    let id = post["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/api/posts/{id}/schedule")))
        .bearer_auth(&token)
        .json(&json!({"scheduled_at": "2030-01-01T09:00:00Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["post"]["status"], "scheduled");

    let scheduled: Value = server
        .client
        .get(server.url("/api/posts/scheduled"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scheduled["data"]["posts"].as_array().unwrap().len(), 1);

    let response = server
        .client
        .post(server.url(&format!("/api/posts/{id}/cancel")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let post = &body["data"]["post"];
    assert_eq!(post["status"], "draft");
    assert!(post["scheduled_at"].is_null());
    assert_eq!(post["platforms"][0]["status"], "cancelled");
}

#[tokio::test]
async fn test_schedule_requires_timestamp() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "linkedin", "li-1").await;
    let post = server
        .create_post(TEST_USER, "Launch day", "linkedin", account["id"].as_str().unwrap())
        .await;
    let id = post["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/api/posts/{id}/schedule")))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "scheduled_at is required");
}

#[tokio::test]
async fn test_update_duplicate_and_delete() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "instagram", "ig-1").await;
    let post = server
        .create_post(TEST_USER, "First draft", "instagram", account["id"].as_str().unwrap())
        .await;
    let id = post["id"].as_str().unwrap();

    let response = server
        .client
        .patch(server.url(&format!("/api/posts/{id}")))
        .bearer_auth(&token)
        .json(&json!({"content": "Second draft", "tags": ["launch"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["post"]["content"], "Second draft");

    let response = server
        .client
        .post(server.url(&format!("/api/posts/{id}/duplicate")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let copy = &body["data"]["post"];
    assert_ne!(copy["id"], post["id"]);
    assert_eq!(copy["status"], "draft");
    assert!(copy["title"].as_str().unwrap().ends_with("(Copy)"));

    let response = server
        .client
        .delete(server.url(&format!("/api/posts/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.url(&format!("/api/posts/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let listing: Value = server
        .client
        .get(server.url("/api/posts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_listing_paginates_and_stays_owner_scoped() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "twitter", "tw-1").await;
    let account_id = account["id"].as_str().unwrap();
    for n in 0..5 {
        server
            .create_post(TEST_USER, &format!("Post {n}"), "twitter", account_id)
            .await;
    }
    let other = server.connect_account(OTHER_USER, "twitter", "tw-2").await;
    server
        .create_post(OTHER_USER, "Not yours", "twitter", other["id"].as_str().unwrap())
        .await;

    let page: Value = server
        .client
        .get(server.url("/api/posts?page=2&limit=2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["data"]["posts"].as_array().unwrap().len(), 2);
    assert_eq!(
        page["data"]["pagination"],
        json!({"total": 5, "page": 2, "pages": 3, "limit": 2})
    );

    let past_end: Value = server
        .client
        .get(server.url("/api/posts?page=9&limit=2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(past_end["data"]["posts"].as_array().unwrap().is_empty());
    assert_eq!(past_end["data"]["pagination"]["total"], 5);

    let searched: Value = server
        .client
        .get(server.url("/api/posts?search=not%20yours"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(searched["data"]["pagination"]["total"], 0);
}
