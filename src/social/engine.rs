//! Likes, plays, playlists, comments and ownership-gated post mutation.

use super::error::ServiceError;
use super::playlists::{self, AddSongResult, PlaylistSelector, DEFAULT_PLAYLIST_NAME};
use super::store_call::run_store_call;
use super::validation::{Validator, MAX_COMMENT_LEN, MIN_POST_TEXT_LEN};
use crate::media::{release_in_background, AudioRef, AudioStorage, AudioStorageError};
use crate::store::{
    Category, CategoryRename, CategoryStore, Comment, FullStore, LikeOutcome, Playlist, Post,
    PostChanges, PostDraft, PostId, PostPage, PostQuery, PostStore, SocialStore, User, UserId,
    UserStore,
};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts at writing a playlist collection before giving up on a user
/// whose playlists keep changing underneath.
const MAX_PLAYLIST_WRITE_ATTEMPTS: usize = 5;

/// Title, description and category of a post, already validated.
#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub description: String,
    pub category: String,
}

impl PostFields {
    pub fn new(title: &str, description: &str, category: &str) -> Result<Self, ServiceError> {
        let mut validator = Validator::new();
        let title = validator.min_len("title", title, MIN_POST_TEXT_LEN);
        let description = validator.min_len("description", description, MIN_POST_TEXT_LEN);
        let category = validator.not_empty("category", category);
        validator.finish()?;
        Ok(Self {
            title,
            description,
            category,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct CreatedPost {
    pub post: Post,
    pub creator: User,
}

pub struct SocialEngine {
    store: Arc<dyn FullStore>,
    audio: Arc<dyn AudioStorage>,
    store_timeout: Duration,
}

impl SocialEngine {
    pub fn new(
        store: Arc<dyn FullStore>,
        audio: Arc<dyn AudioStorage>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            audio,
            store_timeout,
        }
    }

    async fn call<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce(Arc<dyn FullStore>) -> Result<T, ServiceError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        run_store_call(self.store_timeout, move || call(store)).await
    }

    // =========================================================================
    // Posts
    // =========================================================================

    pub async fn feed(&self, query: PostQuery) -> Result<PostPage, ServiceError> {
        self.call(move |store| Ok(store.query_posts(&query)?)).await
    }

    pub async fn get_post(&self, post_id: PostId) -> Result<Post, ServiceError> {
        self.call(move |store| store.get_post(post_id)?.ok_or_else(ServiceError::post_not_found))
            .await
    }

    pub async fn create_post(
        &self,
        user_id: UserId,
        fields: PostFields,
        upload: AudioUpload,
    ) -> Result<CreatedPost, ServiceError> {
        let audio_ref = self.store_audio(upload).await?;

        let audio = audio_ref.to_string();
        let result = self
            .call(move |store| {
                let creator = store
                    .get_user(user_id)?
                    .ok_or_else(ServiceError::user_not_found)?;
                let draft = PostDraft {
                    title: fields.title,
                    description: fields.description,
                    category: fields.category,
                    audio,
                    creator: user_id,
                };
                let post = store
                    .create_post(&draft)?
                    .ok_or_else(ServiceError::user_not_found)?;
                Ok(CreatedPost { post, creator })
            })
            .await;

        match &result {
            Ok(created) => info!("User {} created post {}", user_id, created.post.id),
            Err(_) => release_in_background(self.audio.clone(), vec![audio_ref]),
        }
        result
    }

    /// Replaces the fields of a post owned by `user_id`, and its audio when an
    /// upload is given.
    pub async fn update_post(
        &self,
        user_id: UserId,
        post_id: PostId,
        fields: PostFields,
        upload: Option<AudioUpload>,
    ) -> Result<Post, ServiceError> {
        let existing = self.owned_post(user_id, post_id).await?;

        let new_audio = match upload {
            Some(upload) => Some(self.store_audio(upload).await?),
            None => None,
        };

        let changes = PostChanges {
            title: fields.title,
            description: fields.description,
            category: fields.category,
            audio: new_audio.as_ref().map(|audio_ref| audio_ref.to_string()),
        };
        let result = self
            .call(move |store| {
                store
                    .update_post(post_id, &changes)?
                    .ok_or_else(ServiceError::post_not_found)
            })
            .await;

        match (&result, new_audio) {
            (Ok(_), Some(new_audio)) if new_audio.as_str() != existing.audio => {
                release_in_background(self.audio.clone(), vec![AudioRef(existing.audio)]);
            }
            (Err(_), Some(new_audio)) => {
                release_in_background(self.audio.clone(), vec![new_audio]);
            }
            _ => {}
        }
        result
    }

    /// Deletes a post owned by `user_id`. Its audio file is released in the
    /// background.
    pub async fn delete_post(&self, user_id: UserId, post_id: PostId) -> Result<(), ServiceError> {
        let post = self.owned_post(user_id, post_id).await?;

        let deleted = self.call(move |store| Ok(store.delete_post(post_id)?)).await?;
        if !deleted {
            return Err(ServiceError::post_not_found());
        }
        info!("User {} deleted post {}", user_id, post_id);
        release_in_background(self.audio.clone(), vec![AudioRef(post.audio)]);
        Ok(())
    }

    async fn owned_post(&self, user_id: UserId, post_id: PostId) -> Result<Post, ServiceError> {
        let post = self.get_post(post_id).await?;
        if post.creator != user_id {
            debug!(
                "User {} tried to mutate post {} of user {}",
                user_id, post_id, post.creator
            );
            return Err(ServiceError::Forbidden);
        }
        Ok(post)
    }

    async fn store_audio(&self, upload: AudioUpload) -> Result<AudioRef, ServiceError> {
        match self.audio.store(upload.bytes, &upload.file_name).await {
            Ok(audio_ref) => Ok(audio_ref),
            Err(AudioStorageError::UnsupportedType(mime)) => {
                debug!("Rejected upload {} of type {}", upload.file_name, mime);
                Err(ServiceError::validation("audio", "No audio"))
            }
            Err(AudioStorageError::InvalidFilename(name)) => {
                Err(ServiceError::validation("audio", &format!("Invalid file name {}", name)))
            }
            Err(err) => Err(ServiceError::Internal(anyhow!("Failed to store audio: {}", err))),
        }
    }

    // =========================================================================
    // Likes, plays and comments
    // =========================================================================

    /// Likes a post once. Repeated calls return the post unchanged.
    pub async fn like(&self, user_id: UserId, post_id: PostId) -> Result<Post, ServiceError> {
        self.call(move |store| match store.like_post(user_id, post_id)? {
            LikeOutcome::Liked(post) => {
                debug!("User {} liked post {}", user_id, post_id);
                Ok(post)
            }
            LikeOutcome::AlreadyLiked(post) => Ok(post),
            LikeOutcome::UserNotFound => Err(ServiceError::user_not_found()),
            LikeOutcome::PostNotFound => Err(ServiceError::post_not_found()),
        })
        .await
    }

    pub async fn play(&self, post_id: PostId) -> Result<Post, ServiceError> {
        self.call(move |store| {
            store
                .increment_plays(post_id)?
                .ok_or_else(ServiceError::post_not_found)
        })
        .await
    }

    /// Appends a comment signed with the acting user's current name.
    pub async fn add_comment(
        &self,
        user_id: UserId,
        post_id: PostId,
        text: String,
    ) -> Result<Comment, ServiceError> {
        let mut validator = Validator::new();
        let text = validator.len_between("text", &text, 1, MAX_COMMENT_LEN);
        validator.finish()?;

        self.call(move |store| {
            let author = store
                .get_user(user_id)?
                .ok_or_else(ServiceError::user_not_found)?;
            store
                .add_comment(post_id, &text, &author.name)?
                .ok_or_else(ServiceError::post_not_found)
        })
        .await
    }

    pub async fn library(&self, user_id: UserId) -> Result<Vec<Post>, ServiceError> {
        self.call(move |store| {
            store
                .get_library(user_id)?
                .ok_or_else(ServiceError::user_not_found)
        })
        .await
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    pub async fn playlists(&self, user_id: UserId) -> Result<Vec<Playlist>, ServiceError> {
        self.call(move |store| {
            store
                .get_playlists(user_id)?
                .map(|snapshot| snapshot.playlists)
                .ok_or_else(ServiceError::user_not_found)
        })
        .await
    }

    /// Adds a post to the named playlist (the default one when `name` is
    /// None), creating the playlist if needed.
    pub async fn add_song_to_playlist(
        &self,
        user_id: UserId,
        post_id: PostId,
        name: Option<String>,
    ) -> Result<Vec<Playlist>, ServiceError> {
        let name = match name {
            Some(name) => not_empty_name(&name)?,
            None => DEFAULT_PLAYLIST_NAME.to_string(),
        };
        let post_exists = self
            .call(move |store| Ok(store.get_post(post_id)?.is_some()))
            .await?;
        if !post_exists {
            return Err(ServiceError::post_not_found());
        }
        self.mutate_playlists(user_id, move |playlists| {
            match playlists::add_song(playlists, &name, post_id, playlists::new_playlist_id) {
                AddSongResult::Created(id) => {
                    debug!("User {} created playlist {} with post {}", user_id, id, post_id)
                }
                AddSongResult::Appended(id) => {
                    debug!("User {} added post {} to playlist {}", user_id, post_id, id)
                }
                AddSongResult::AlreadyPresent(id) => {
                    debug!("Post {} already in playlist {} of user {}", post_id, id, user_id)
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn rename_playlist(
        &self,
        user_id: UserId,
        playlist_id: String,
        name: String,
    ) -> Result<Vec<Playlist>, ServiceError> {
        let name = not_empty_name(&name)?;
        self.mutate_playlists(user_id, move |playlists| {
            if playlists::rename(playlists, &playlist_id, &name) {
                Ok(())
            } else {
                Err(playlist_not_found())
            }
        })
        .await
    }

    pub async fn remove_song_from_playlist(
        &self,
        user_id: UserId,
        selector: PlaylistSelector,
        post_id: PostId,
    ) -> Result<Vec<Playlist>, ServiceError> {
        self.mutate_playlists(user_id, move |playlists| {
            if playlists::remove_song(playlists, &selector, post_id) {
                Ok(())
            } else {
                Err(playlist_not_found())
            }
        })
        .await
    }

    pub async fn remove_playlist(
        &self,
        user_id: UserId,
        selector: PlaylistSelector,
    ) -> Result<Vec<Playlist>, ServiceError> {
        self.mutate_playlists(user_id, move |playlists| {
            if playlists::remove_playlists(playlists, &selector) > 0 {
                Ok(())
            } else {
                Err(playlist_not_found())
            }
        })
        .await
    }

    /// Loads the user's playlists, applies `mutate` and writes the whole
    /// collection back if nobody else wrote it meanwhile, retrying otherwise.
    async fn mutate_playlists<F>(
        &self,
        user_id: UserId,
        mutate: F,
    ) -> Result<Vec<Playlist>, ServiceError>
    where
        F: Fn(&mut Vec<Playlist>) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        let mutate = Arc::new(mutate);
        for attempt in 1..=MAX_PLAYLIST_WRITE_ATTEMPTS {
            let mutate = mutate.clone();
            let written = self
                .call(move |store| {
                    let snapshot = store
                        .get_playlists(user_id)?
                        .ok_or_else(ServiceError::user_not_found)?;
                    let mut playlists = snapshot.playlists;
                    mutate(&mut playlists)?;
                    if store.replace_playlists(user_id, snapshot.version, &playlists)? {
                        Ok(Some(playlists))
                    } else {
                        Ok(None)
                    }
                })
                .await?;
            match written {
                Some(playlists) => return Ok(playlists),
                None => debug!(
                    "Playlists of user {} changed concurrently, attempt {}",
                    user_id, attempt
                ),
            }
        }
        warn!(
            "Giving up on playlists of user {} after {} attempts",
            user_id, MAX_PLAYLIST_WRITE_ATTEMPTS
        );
        Err(ServiceError::Internal(anyhow!(
            "Playlists of user {} kept changing",
            user_id
        )))
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn categories(&self) -> Result<Vec<Category>, ServiceError> {
        self.call(move |store| Ok(store.get_categories()?)).await
    }

    pub async fn create_category(&self, name: String) -> Result<Vec<Category>, ServiceError> {
        let name = not_empty_name(&name)?;
        self.call(move |store| {
            if store.create_category(&name)?.is_none() {
                return Err(ServiceError::validation("name", "Category already exists"));
            }
            Ok(store.get_categories()?)
        })
        .await
    }

    pub async fn rename_category(
        &self,
        category_id: usize,
        name: String,
    ) -> Result<Category, ServiceError> {
        let name = not_empty_name(&name)?;
        self.call(move |store| match store.rename_category(category_id, &name)? {
            CategoryRename::Renamed(category) => Ok(category),
            CategoryRename::NotFound => {
                Err(ServiceError::NotFound("Category not found.".to_string()))
            }
            CategoryRename::NameTaken => {
                Err(ServiceError::validation("name", "Category already exists"))
            }
        })
        .await
    }
}

fn not_empty_name(name: &str) -> Result<String, ServiceError> {
    let mut validator = Validator::new();
    let name = validator.not_empty("name", name);
    validator.finish()?;
    Ok(name)
}

fn playlist_not_found() -> ServiceError {
    ServiceError::NotFound("Playlist not found.".to_string())
}
