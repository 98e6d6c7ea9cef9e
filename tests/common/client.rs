//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all soundshare-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use super::fixtures::mp3_bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

/// Fields of a post form. `audio` is `(bytes, file name)`.
#[derive(Clone)]
pub struct PostUpload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub audio: Option<(Vec<u8>, String)>,
}

impl PostUpload {
    /// A valid post in the rock category with an mp3 attached.
    pub fn valid(title: &str) -> Self {
        Self {
            title: title.to_string(),
            description: "Recorded live in the garage".to_string(),
            category: ROCK_CATEGORY.to_string(),
            audio: Some((mp3_bytes(), "garage take.mp3".to_string())),
        }
    }

    pub fn in_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn without_audio(mut self) -> Self {
        self.audio = None;
        self
    }

    fn into_form(self) -> Form {
        let form = Form::new()
            .text("title", self.title)
            .text("description", self.description)
            .text("category", self.category);
        match self.audio {
            Some((bytes, file_name)) => form.part(
                "audio",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .expect("Invalid mime type"),
            ),
            None => form,
        }
    }
}

/// HTTP test client with bearer-token session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Token sent as `Authorization: Bearer`, when logged in
    pub token: Option<String>,
    /// Id of the logged in user
    pub user_id: Option<usize>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
            user_id: None,
        }
    }

    /// Creates a client logged in with the given credentials
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_as(base_url: String, email: &str, password: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Authentication of {} failed",
            email
        );
        let body: Value = response.json().await.expect("Invalid login response");
        client.token = body["token"].as_str().map(str::to_string);
        client.user_id = body["userId"].as_u64().map(|id| id as usize);
        assert!(client.token.is_some(), "Login response without token");

        client
    }

    /// Creates a client pre-authenticated as the regular test user
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the second regular user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_USER, OTHER_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Response {
        self.authed(builder).send().await.expect("Request failed")
    }

    // ========================================================================
    // Home
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.send(self.client.get(self.url("/"))).await
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// PUT /auth/signup
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> Response {
        self.send(self.client.put(self.url("/auth/signup")).json(&json!({
            "email": email,
            "name": name,
            "password": password,
        })))
        .await
    }

    /// POST /auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send(self.client.post(self.url("/auth/login")).json(&json!({
            "email": email,
            "password": password,
        })))
        .await
    }

    /// GET /auth/users
    pub async fn get_users(&self) -> Response {
        self.send(self.client.get(self.url("/auth/users"))).await
    }

    /// PUT /auth/user/{user_id}
    pub async fn update_user(&self, user_id: usize, changes: Value) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/auth/user/{}", user_id)))
                .json(&changes),
        )
        .await
    }

    /// DELETE /auth/user/{user_id}
    pub async fn delete_user(&self, user_id: usize) -> Response {
        self.send(self.client.delete(self.url(&format!("/auth/user/{}", user_id))))
            .await
    }

    // ========================================================================
    // Feed Endpoints
    // ========================================================================

    /// GET /feed/posts?page=N
    pub async fn get_feed(&self, page: Option<usize>) -> Response {
        let url = match page {
            Some(page) => self.url(&format!("/feed/posts?page={}", page)),
            None => self.url("/feed/posts"),
        };
        self.send(self.client.get(url)).await
    }

    /// GET /feed/posts/{category}?page=N
    pub async fn get_category_feed(&self, category: &str, page: usize) -> Response {
        self.send(
            self.client
                .get(self.url(&format!("/feed/posts/{}?page={}", category, page))),
        )
        .await
    }

    /// GET /feed/likes?page=N
    pub async fn get_popular_feed(&self, page: usize) -> Response {
        self.send(self.client.get(self.url(&format!("/feed/likes?page={}", page))))
            .await
    }

    /// GET /feed/post/{post_id}
    pub async fn get_post(&self, post_id: usize) -> Response {
        self.send(self.client.get(self.url(&format!("/feed/post/{}", post_id))))
            .await
    }

    /// POST /feed/post
    pub async fn create_post(&self, upload: PostUpload) -> Response {
        self.send(
            self.client
                .post(self.url("/feed/post"))
                .multipart(upload.into_form()),
        )
        .await
    }

    /// Creates a valid post and returns its id.
    pub async fn create_post_ok(&self, title: &str) -> usize {
        let response = self.create_post(PostUpload::valid(title)).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid create response");
        body["post"]["id"].as_u64().expect("Post without id") as usize
    }

    /// PUT /feed/post/{post_id}
    pub async fn update_post(&self, post_id: usize, upload: PostUpload) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/feed/post/{}", post_id)))
                .multipart(upload.into_form()),
        )
        .await
    }

    /// DELETE /feed/post/{post_id}
    pub async fn delete_post(&self, post_id: usize) -> Response {
        self.send(self.client.delete(self.url(&format!("/feed/post/{}", post_id))))
            .await
    }

    /// PUT /feed/post/likes/{post_id}
    pub async fn like_post(&self, post_id: usize) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/feed/post/likes/{}", post_id))),
        )
        .await
    }

    /// PUT /feed/post/plays/{post_id}
    pub async fn play_post(&self, post_id: usize) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/feed/post/plays/{}", post_id))),
        )
        .await
    }

    /// POST /feed/post/{post_id}/comments
    pub async fn add_comment(&self, post_id: usize, text: &str) -> Response {
        self.send(
            self.client
                .post(self.url(&format!("/feed/post/{}/comments", post_id)))
                .json(&json!({ "text": text })),
        )
        .await
    }

    /// GET /feed/library
    pub async fn get_library(&self) -> Response {
        self.send(self.client.get(self.url("/feed/library"))).await
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    /// GET /feed/playlists
    pub async fn get_playlists(&self) -> Response {
        self.send(self.client.get(self.url("/feed/playlists"))).await
    }

    /// PUT /feed/playlists/songs
    pub async fn add_to_playlist(&self, post_id: usize, name: Option<&str>) -> Response {
        let body = match name {
            Some(name) => json!({ "postId": post_id, "name": name }),
            None => json!({ "postId": post_id }),
        };
        self.send(self.client.put(self.url("/feed/playlists/songs")).json(&body))
            .await
    }

    /// PATCH /feed/playlists/{playlist_id}
    pub async fn rename_playlist(&self, playlist_id: &str, name: &str) -> Response {
        self.send(
            self.client
                .patch(self.url(&format!("/feed/playlists/{}", playlist_id)))
                .json(&json!({ "name": name })),
        )
        .await
    }

    /// DELETE /feed/playlists/{playlist_id}/songs/{post_id}
    pub async fn remove_playlist_song(&self, playlist_id: &str, post_id: usize) -> Response {
        self.send(self.client.delete(self.url(&format!(
            "/feed/playlists/{}/songs/{}",
            playlist_id, post_id
        ))))
        .await
    }

    /// DELETE /feed/playlists/{playlist_id}
    pub async fn remove_playlist(&self, playlist_id: &str) -> Response {
        self.send(
            self.client
                .delete(self.url(&format!("/feed/playlists/{}", playlist_id))),
        )
        .await
    }

    /// DELETE /feed/playlists/by-name/{name}/songs/{post_id}
    pub async fn remove_named_playlist_song(&self, name: &str, post_id: usize) -> Response {
        self.send(self.client.delete(self.url(&format!(
            "/feed/playlists/by-name/{}/songs/{}",
            name, post_id
        ))))
        .await
    }

    /// DELETE /feed/playlists/by-name/{name}
    pub async fn remove_named_playlists(&self, name: &str) -> Response {
        self.send(
            self.client
                .delete(self.url(&format!("/feed/playlists/by-name/{}", name))),
        )
        .await
    }

    // ========================================================================
    // Category Endpoints
    // ========================================================================

    /// GET /category
    pub async fn get_categories(&self) -> Response {
        self.send(self.client.get(self.url("/category"))).await
    }

    /// POST /category
    pub async fn create_category(&self, name: &str) -> Response {
        self.send(
            self.client
                .post(self.url("/category"))
                .json(&json!({ "name": name })),
        )
        .await
    }

    /// PUT /category/{category_id}
    pub async fn rename_category(&self, category_id: usize, name: &str) -> Response {
        self.send(
            self.client
                .put(self.url(&format!("/category/{}", category_id)))
                .json(&json!({ "name": name })),
        )
        .await
    }

    // ========================================================================
    // Static Audio
    // ========================================================================

    /// GET /{audio_ref}, where `audio_ref` is the `audio` field of a post.
    pub async fn get_audio(&self, audio_ref: &str) -> Response {
        self.send(self.client.get(self.url(&format!("/{}", audio_ref))))
            .await
    }
}
