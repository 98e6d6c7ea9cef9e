//! Posts, likes, plays, comments, library and playlists.

use super::json_body::JsonBody;
use super::session::Session;
use super::state::{GuardedSocialEngine, ServerState};
use super::ServerConfig;
use crate::social::{AudioUpload, PlaylistSelector, PostFields, ServiceError};
use crate::store::{Comment, Playlist, Post, PostId, PostQuery, PostSort, User};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Deserialize, Debug, Default)]
struct PageQuery {
    pub page: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse {
    message: &'static str,
    posts: Vec<Post>,
    total_items: usize,
}

#[derive(Serialize)]
struct PostResponse {
    message: &'static str,
    post: Post,
}

#[derive(Serialize)]
struct CreatorSummary {
    id: usize,
    name: String,
}

impl From<User> for CreatorSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

#[derive(Serialize)]
struct CreatedPostResponse {
    message: &'static str,
    post: Post,
    creator: CreatorSummary,
}

#[derive(Serialize)]
struct PostsResponse {
    message: &'static str,
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct CommentBody {
    pub text: String,
}

#[derive(Serialize)]
struct CommentResponse {
    message: &'static str,
    comment: Comment,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddSongBody {
    pub post_id: PostId,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct RenamePlaylistBody {
    pub name: String,
}

#[derive(Serialize)]
struct PlaylistsResponse {
    message: &'static str,
    playlists: Vec<Playlist>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Text fields and optional audio file of a post form.
#[derive(Default)]
struct PostForm {
    title: String,
    description: String,
    category: String,
    audio: Option<AudioUpload>,
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, ServiceError> {
    let mut form = PostForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read multipart field: {}", e);
                return Err(ServiceError::validation("audio", "Could not read upload"));
            }
        };
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audio" => {
                let file_name = field.file_name().unwrap_or("audio.mp3").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    warn!("Failed to read audio data: {}", e);
                    ServiceError::validation("audio", "Could not read upload")
                })?;
                if !bytes.is_empty() {
                    form.audio = Some(AudioUpload {
                        bytes: bytes.to_vec(),
                        file_name,
                    });
                }
            }
            "title" | "description" | "category" => {
                let value = field.text().await.map_err(|e| {
                    warn!("Failed to read field {}: {}", field_name, e);
                    ServiceError::validation(&field_name, "Could not read field")
                })?;
                match field_name.as_str() {
                    "title" => form.title = value,
                    "description" => form.description = value,
                    _ => form.category = value,
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn feed_page(
    engine: &GuardedSocialEngine,
    config: &ServerConfig,
    category: Option<String>,
    sort: PostSort,
    page: Option<usize>,
) -> Result<Json<FeedResponse>, ServiceError> {
    let query = PostQuery {
        category,
        sort,
        page: page.unwrap_or(1).max(1),
        per_page: config.posts_per_page,
    };
    let page = engine.feed(query).await?;
    Ok(Json(FeedResponse {
        message: "Success",
        posts: page.posts,
        total_items: page.total_items,
    }))
}

async fn get_posts(
    State(engine): State<GuardedSocialEngine>,
    State(config): State<ServerConfig>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, ServiceError> {
    feed_page(&engine, &config, None, PostSort::Newest, query.page).await
}

async fn get_category_posts(
    State(engine): State<GuardedSocialEngine>,
    State(config): State<ServerConfig>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, ServiceError> {
    feed_page(&engine, &config, Some(category), PostSort::Newest, query.page).await
}

async fn get_popular_posts(
    State(engine): State<GuardedSocialEngine>,
    State(config): State<ServerConfig>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FeedResponse>, ServiceError> {
    feed_page(&engine, &config, None, PostSort::MostLiked, query.page).await
}

async fn get_post(
    State(engine): State<GuardedSocialEngine>,
    Path(post_id): Path<PostId>,
) -> Result<Json<PostResponse>, ServiceError> {
    let post = engine.get_post(post_id).await?;
    Ok(Json(PostResponse {
        message: "Post fetched.",
        post,
    }))
}

async fn create_post(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let form = read_post_form(multipart).await?;
    let fields = PostFields::new(&form.title, &form.description, &form.category)?;
    let upload = form
        .audio
        .ok_or_else(|| ServiceError::validation("audio", "No audio"))?;

    let created = engine.create_post(session.user_id, fields, upload).await?;
    let response = CreatedPostResponse {
        message: "Success!",
        post: created.post,
        creator: created.creator.into(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn update_post(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(post_id): Path<PostId>,
    multipart: Multipart,
) -> Result<Json<PostResponse>, ServiceError> {
    let form = read_post_form(multipart).await?;
    let fields = PostFields::new(&form.title, &form.description, &form.category)?;

    let post = engine
        .update_post(session.user_id, post_id, fields, form.audio)
        .await?;
    Ok(Json(PostResponse {
        message: "Post updated!",
        post,
    }))
}

async fn delete_post(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(post_id): Path<PostId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    engine.delete_post(session.user_id, post_id).await?;
    Ok(Json(MessageResponse {
        message: "Deleted post.",
    }))
}

async fn like_post(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(post_id): Path<PostId>,
) -> Result<Json<PostResponse>, ServiceError> {
    let post = engine.like(session.user_id, post_id).await?;
    Ok(Json(PostResponse {
        message: "Post liked.",
        post,
    }))
}

async fn play_post(
    State(engine): State<GuardedSocialEngine>,
    Path(post_id): Path<PostId>,
) -> Result<Json<PostResponse>, ServiceError> {
    let post = engine.play(post_id).await?;
    Ok(Json(PostResponse {
        message: "Post played.",
        post,
    }))
}

async fn add_comment(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(post_id): Path<PostId>,
    JsonBody(body): JsonBody<CommentBody>,
) -> Result<Response, ServiceError> {
    let comment = engine
        .add_comment(session.user_id, post_id, body.text)
        .await?;
    let response = CommentResponse {
        message: "Comment added.",
        comment,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn get_library(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
) -> Result<Json<PostsResponse>, ServiceError> {
    let posts = engine.library(session.user_id).await?;
    Ok(Json(PostsResponse {
        message: "Success",
        posts,
    }))
}

fn playlists_response(playlists: Vec<Playlist>) -> Json<PlaylistsResponse> {
    Json(PlaylistsResponse {
        message: "Success",
        playlists,
    })
}

async fn get_playlists(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine.playlists(session.user_id).await?;
    Ok(playlists_response(playlists))
}

async fn add_playlist_song(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    JsonBody(body): JsonBody<AddSongBody>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine
        .add_song_to_playlist(session.user_id, body.post_id, body.name)
        .await?;
    Ok(playlists_response(playlists))
}

async fn rename_playlist(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(playlist_id): Path<String>,
    JsonBody(body): JsonBody<RenamePlaylistBody>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine
        .rename_playlist(session.user_id, playlist_id, body.name)
        .await?;
    Ok(playlists_response(playlists))
}

async fn remove_playlist_song(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path((playlist_id, post_id)): Path<(String, PostId)>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine
        .remove_song_from_playlist(session.user_id, PlaylistSelector::Id(playlist_id), post_id)
        .await?;
    Ok(playlists_response(playlists))
}

async fn remove_playlist(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(playlist_id): Path<String>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine
        .remove_playlist(session.user_id, PlaylistSelector::Id(playlist_id))
        .await?;
    Ok(playlists_response(playlists))
}

async fn remove_named_playlist_song(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path((name, post_id)): Path<(String, PostId)>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine
        .remove_song_from_playlist(session.user_id, PlaylistSelector::Name(name), post_id)
        .await?;
    Ok(playlists_response(playlists))
}

async fn remove_named_playlists(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    Path(name): Path<String>,
) -> Result<Json<PlaylistsResponse>, ServiceError> {
    let playlists = engine
        .remove_playlist(session.user_id, PlaylistSelector::Name(name))
        .await?;
    Ok(playlists_response(playlists))
}

pub fn make_feed_routes(state: ServerState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/posts", get(get_posts))
        .route("/posts/{category}", get(get_category_posts))
        .route("/likes", get(get_popular_posts))
        .route("/post", post(create_post))
        .route("/post/{post_id}", get(get_post))
        .route("/post/{post_id}", put(update_post))
        .route("/post/{post_id}", delete(delete_post))
        .route("/post/likes/{post_id}", put(like_post))
        .route("/post/plays/{post_id}", put(play_post))
        .route("/post/{post_id}/comments", post(add_comment))
        .route("/library", get(get_library))
        .route("/playlists", get(get_playlists))
        .route("/playlists/songs", put(add_playlist_song))
        .route("/playlists/{playlist_id}", patch(rename_playlist))
        .route("/playlists/{playlist_id}", delete(remove_playlist))
        .route(
            "/playlists/{playlist_id}/songs/{post_id}",
            delete(remove_playlist_song),
        )
        .route(
            "/playlists/by-name/{name}/songs/{post_id}",
            delete(remove_named_playlist_song),
        )
        .route("/playlists/by-name/{name}", delete(remove_named_playlists))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
