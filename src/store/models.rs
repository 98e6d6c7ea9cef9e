//! Persistent entities of the sharing platform.
//!
//! A user's `posts`, `library` and `playlists` and a post's `likedBy` and
//! `comments` are stored as separate rows and assembled into these models on
//! read.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type UserId = usize;
pub type PostId = usize;

/// Status given to every user at signup.
pub const DEFAULT_USER_STATUS: &str = "User!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Regular,
    Admin,
}

impl UserRole {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            UserRole::Regular => "Regular",
            UserRole::Admin => "Admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "Regular" | "regular" => Ok(UserRole::Regular),
            "Admin" | "admin" => Ok(UserRole::Admin),
            _ => anyhow::bail!("Unknown user role {}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub status: String,
    pub role: UserRole,
    pub created_at: i64,
}

/// A user together with its relationship collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub posts: Vec<PostId>,
    pub library: Vec<PostId>,
    pub playlists: Vec<Playlist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: usize,
    pub text: String,
    pub author_name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub audio: String,
    pub likes: u64,
    pub plays: u64,
    pub creator: UserId,
    pub liked_by: Vec<UserId>,
    pub comments: Vec<Comment>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub songs: Vec<PostId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: usize,
    pub name: String,
}

/// Everything needed to insert a user and its password credentials at once.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub salt: String,
    pub hash: String,
    pub hasher: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCredentials {
    pub user_id: UserId,
    pub salt: String,
    pub hash: String,
    pub hasher: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserUpdateOutcome {
    Updated(User),
    UserNotFound,
    EmailTaken,
}

/// Left behind by a user deletion: audio files of the posts that went with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedUser {
    pub user: User,
    pub audio_refs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub audio: String,
    pub creator: UserId,
}

/// Field changes of a post. `audio` is only replaced when set.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub description: String,
    pub category: String,
    pub audio: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    Newest,
    MostLiked,
}

#[derive(Debug, Clone)]
pub struct PostQuery {
    pub category: Option<String>,
    pub sort: PostSort,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    UserNotFound,
    PostNotFound,
    Liked(Post),
    AlreadyLiked(Post),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistsSnapshot {
    pub version: i64,
    pub playlists: Vec<Playlist>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRename {
    Renamed(Category),
    NotFound,
    NameTaken,
}

/// A post whose `likes` counter disagrees with its like rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeCounterMismatch {
    pub post_id: PostId,
    pub likes: u64,
    pub liked_by: u64,
    pub in_libraries: u64,
}
