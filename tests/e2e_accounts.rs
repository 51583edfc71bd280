//! E2E tests for social account endpoints

mod common;

use common::{OTHER_USER, TEST_USER, TestServer};
use serde_json::{Value, json};

#[tokio::test]
async fn test_connect_then_reconnect() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let payload = json!({
        "platform": "facebook",
        "name": "Acme",
        "username": "acme",
        "access_token": "token-1",
        "platform_user_id": "fb-42",
    });

    let created = server
        .client
        .post(server.url("/api/accounts/connect"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.unwrap();
    let account = &created["data"]["account"];
    assert_eq!(account["platform"], "facebook");
    assert_eq!(account["is_connected"], true);
    // Credentials are never serialized
    assert!(account.get("access_token").is_none());

    let reconnected = server
        .client
        .post(server.url("/api/accounts/connect"))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(reconnected.status(), 200);
    let reconnected: Value = reconnected.json().await.unwrap();
    assert_eq!(reconnected["message"], "Account reconnected successfully");
    assert_eq!(reconnected["data"]["account"]["id"], account["id"]);
}

#[tokio::test]
async fn test_connect_rejects_missing_fields() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/accounts/connect"))
        .bearer_auth(server.create_test_token(TEST_USER))
        .json(&json!({
            "platform": "twitter",
            "name": "",
            "username": "acme",
            "access_token": "token",
            "platform_user_id": "tw-1",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Account name is required");
}

#[tokio::test]
async fn test_disconnect_settings_and_stats() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "instagram", "ig-1").await;
    server.connect_account(TEST_USER, "instagram", "ig-2").await;
    let id = account["id"].as_str().unwrap();

    let response = server
        .client
        .patch(server.url(&format!("/api/accounts/{id}/settings")))
        .bearer_auth(&token)
        .json(&json!({"auto_publish": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["account"]["settings"]["auto_publish"], true);

    let response = server
        .client
        .post(server.url(&format!("/api/accounts/{id}/disconnect")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["account"]["is_connected"], false);

    let stats: Value = server
        .client
        .get(server.url("/api/accounts/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let stats = stats["data"]["stats"].as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["platform"], "instagram");
    assert_eq!(stats[0]["accounts"], 1);
}

#[tokio::test]
async fn test_accounts_are_owner_scoped() {
    let server = TestServer::new().await;
    let account = server.connect_account(TEST_USER, "linkedin", "li-1").await;
    let id = account["id"].as_str().unwrap();
    let other_token = server.create_test_token(OTHER_USER);

    let response = server
        .client
        .get(server.url(&format!("/api/accounts/{id}")))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = server
        .client
        .delete(server.url(&format!("/api/accounts/{id}")))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let listing: Value = server
        .client
        .get(server.url("/api/accounts"))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["data"]["pagination"]["total"], 0);
    assert!(listing["data"]["accounts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_and_sync() {
    let server = TestServer::new().await;
    let token = server.create_test_token(TEST_USER);
    let account = server.connect_account(TEST_USER, "youtube", "yt-1").await;
    let id = account["id"].as_str().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/api/accounts/{id}/refresh")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .post(server.url(&format!("/api/accounts/{id}/sync")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["account"]["last_synced_at"].is_string());
}
