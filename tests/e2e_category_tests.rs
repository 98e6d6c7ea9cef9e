//! End-to-end tests for category endpoints

mod common;

use common::{TestClient, TestServer, JAZZ_CATEGORY, ROCK_CATEGORY};
use reqwest::StatusCode;
use serde_json::Value;

fn category_names(body: &Value) -> Vec<String> {
    body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_anyone_lists_categories() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_categories().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Success");
    assert_eq!(category_names(&body), vec![ROCK_CATEGORY, JAZZ_CATEGORY]);
}

#[tokio::test]
async fn test_only_admin_creates_categories() {
    let server = TestServer::spawn().await;

    let anonymous = TestClient::new(server.base_url.clone());
    assert_eq!(
        anonymous.create_category("blues").await.status(),
        StatusCode::UNAUTHORIZED
    );

    let user = TestClient::authenticated(server.base_url.clone()).await;
    assert_eq!(
        user.create_category("blues").await.status(),
        StatusCode::FORBIDDEN
    );

    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let response = admin.create_category(" blues ").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Category created.");
    assert_eq!(
        category_names(&body),
        vec![ROCK_CATEGORY, JAZZ_CATEGORY, "blues"]
    );

    let response = admin.create_category(ROCK_CATEGORY).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"][0]["field"], "name");

    assert_eq!(
        admin.create_category("   ").await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_only_admin_renames_categories() {
    let server = TestServer::spawn().await;
    let user = TestClient::authenticated(server.base_url.clone()).await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let body: Value = admin.get_categories().await.json().await.unwrap();
    let jazz_id = body["categories"][1]["id"].as_u64().unwrap() as usize;

    assert_eq!(
        user.rename_category(jazz_id, "smooth jazz").await.status(),
        StatusCode::FORBIDDEN
    );

    let response = admin.rename_category(jazz_id, "smooth jazz").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Category updated.");
    assert_eq!(body["category"]["name"], "smooth jazz");
    assert_eq!(body["category"]["id"].as_u64().unwrap(), jazz_id as u64);

    assert_eq!(
        admin.rename_category(jazz_id, ROCK_CATEGORY).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        admin.rename_category(4242, "folk").await.status(),
        StatusCode::NOT_FOUND
    );

    let body: Value = user.get_categories().await.json().await.unwrap();
    assert_eq!(category_names(&body), vec![ROCK_CATEGORY, "smooth jazz"]);
}
