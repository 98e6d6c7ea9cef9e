//! End-to-end tests for authentication endpoints
//!
//! Tests signup, login, token transport and user administration.

mod common;

use common::{
    TestClient, TestServer, ADMIN_USER, OTHER_USER, TEST_PASS, TEST_USER, TEST_USER_NAME,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use soundshare_server::store::UserStore;

#[tokio::test]
async fn test_home_reports_uptime_and_hash() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["uptime"].as_str().unwrap().starts_with("0d "));
    assert!(body["hash"].is_string());
}

#[tokio::test]
async fn test_signup_then_login() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .signup(" New.Person@Example.com ", "New Person", "secret99")
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Success");
    let user_id = body["userId"].as_u64().unwrap();

    let response = client.login("new.person@example.com", "secret99").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["userId"].as_u64().unwrap(), user_id);
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(body["status"], "User!");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_signup_with_duplicate_email() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .signup(&TEST_USER.to_uppercase(), "Copycat", "secret99")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["data"][0]["field"], "email");
}

#[tokio::test]
async fn test_signup_with_invalid_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.signup("not-an-email", "   ", "1234").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json().await.unwrap();
    let fields: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "name", "password"]);
}

#[tokio::test]
async fn test_login_with_invalid_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, "wrong_password").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_nonexistent_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login("nobody@example.com", "password").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_endpoint_requires_authentication() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_library().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut forged = TestClient::new(server.base_url.clone());
    forged.token = Some("definitely.not.valid".to_string());
    let response = forged.get_library().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let token = client.token.clone().unwrap();

    let response = client
        .client
        .get(format!("{}/feed/library", server.base_url))
        .header("Cookie", format!("session_token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_only_admin_lists_users() {
    let server = TestServer::spawn().await;

    let user = TestClient::authenticated(server.base_url.clone()).await;
    let response = user.get_users().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let response = admin.get_users().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 3);
    let emails: Vec<&str> = users.iter().map(|u| u["email"].as_str().unwrap()).collect();
    assert!(emails.contains(&TEST_USER));
    assert!(emails.contains(&ADMIN_USER));
    assert!(users[0]["playlists"].is_array());
}

#[tokio::test]
async fn test_user_updates_own_profile() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let user_id = client.user_id.unwrap();

    let response = client
        .update_user(user_id, json!({ "status": "Listening to jazz" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "User updated.");
    assert_eq!(body["user"]["status"], "Listening to jazz");
    assert_eq!(body["user"]["name"], TEST_USER_NAME);

    let response = client
        .update_user(user_id, json!({ "email": OTHER_USER }))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_user_cannot_update_someone_else() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let other = TestClient::authenticated_other(server.base_url.clone()).await;
    let other_id = other.user_id.unwrap();

    let response = client
        .update_user(other_id, json!({ "name": "Hijacked" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let response = admin
        .update_user(other_id, json!({ "name": "Renamed By Admin" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = server.store.get_user(other_id).unwrap().unwrap();
    assert_eq!(stored.name, "Renamed By Admin");
}

#[tokio::test]
async fn test_admin_deletes_user_with_everything_it_owns() {
    let server = TestServer::spawn().await;
    let user = TestClient::authenticated(server.base_url.clone()).await;
    let other = TestClient::authenticated_other(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let own_post = user.create_post_ok("Doomed song").await;
    let other_post = other.create_post_ok("Surviving song").await;
    assert_eq!(user.like_post(other_post).await.status(), StatusCode::OK);

    let response = user.delete_user(other.user_id.unwrap()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = admin.delete_user(user.user_id.unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Deleted!");

    assert_eq!(
        admin.get_post(own_post).await.status(),
        StatusCode::NOT_FOUND
    );
    let body: Value = admin.get_post(other_post).await.json().await.unwrap();
    assert_eq!(body["post"]["likes"], 0);
    assert_eq!(body["post"]["likedBy"], json!([]));

    let response = TestClient::new(server.base_url.clone())
        .login(TEST_USER, TEST_PASS)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = admin.delete_user(user.user_id.unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
