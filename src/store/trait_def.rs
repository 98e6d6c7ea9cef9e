//! Storage traits consumed by the user manager and the social engine.

use super::models::*;
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Inserts a user together with its password credentials.
    /// Returns Ok(None) if the email is already registered.
    fn create_user(&self, new_user: &NewUser) -> Result<Option<UserId>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Returns Ok(None) if no user is registered with the given email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns the user with its posts, library and playlists.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_profile(&self, user_id: UserId) -> Result<Option<UserProfile>>;

    /// Returns all users ordered by id.
    fn get_all_users(&self) -> Result<Vec<User>>;

    /// Returns Ok(None) if the user has no password credentials.
    fn get_password_credentials(&self, user_id: UserId) -> Result<Option<PasswordCredentials>>;

    /// Replaces the user's password credentials.
    /// Returns Ok(false) if the user does not exist.
    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<bool>;

    fn update_user(&self, user_id: UserId, update: &UserUpdate) -> Result<UserUpdateOutcome>;

    /// Returns Ok(false) if the user does not exist.
    fn set_user_role(&self, user_id: UserId, role: UserRole) -> Result<bool>;

    /// Deletes the user with everything it owns and gives back the likes it
    /// handed out. Returns Ok(None) if the user does not exist.
    fn delete_user(&self, user_id: UserId) -> Result<Option<DeletedUser>>;
}

pub trait PostStore: Send + Sync {
    /// Returns Ok(None) if the creator does not exist.
    fn create_post(&self, draft: &PostDraft) -> Result<Option<Post>>;

    /// Returns Ok(None) if the post does not exist.
    fn get_post(&self, post_id: PostId) -> Result<Option<Post>>;

    fn query_posts(&self, query: &PostQuery) -> Result<PostPage>;

    /// Returns Ok(None) if the post does not exist.
    fn update_post(&self, post_id: PostId, changes: &PostChanges) -> Result<Option<Post>>;

    /// Deletes the post and every reference to it.
    /// Returns Ok(false) if the post does not exist.
    fn delete_post(&self, post_id: PostId) -> Result<bool>;

    /// Atomically adds one play. Returns Ok(None) if the post does not exist.
    fn increment_plays(&self, post_id: PostId) -> Result<Option<Post>>;
}

pub trait SocialStore: Send + Sync {
    /// Adds the post to the user's library, its likedBy and its likes counter
    /// in one transaction. A post already in the library leaves everything
    /// untouched.
    fn like_post(&self, user_id: UserId, post_id: PostId) -> Result<LikeOutcome>;

    /// Returns the liked posts in the order they were liked.
    /// Returns Ok(None) if the user does not exist.
    fn get_library(&self, user_id: UserId) -> Result<Option<Vec<Post>>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_playlists(&self, user_id: UserId) -> Result<Option<PlaylistsSnapshot>>;

    /// Replaces the whole playlist collection if its version is still
    /// `expected_version`. Songs referencing missing posts are dropped.
    /// Returns Ok(false) if the version moved on or the user does not exist.
    fn replace_playlists(
        &self,
        user_id: UserId,
        expected_version: i64,
        playlists: &[Playlist],
    ) -> Result<bool>;

    /// Returns Ok(None) if the post does not exist.
    fn add_comment(&self, post_id: PostId, text: &str, author_name: &str)
        -> Result<Option<Comment>>;

    /// Returns the posts whose likes counter disagrees with the like rows.
    fn audit_like_counters(&self) -> Result<Vec<LikeCounterMismatch>>;
}

pub trait CategoryStore: Send + Sync {
    fn get_categories(&self) -> Result<Vec<Category>>;

    /// Returns Ok(None) if the name is taken.
    fn create_category(&self, name: &str) -> Result<Option<Category>>;

    fn rename_category(&self, category_id: usize, name: &str) -> Result<CategoryRename>;
}

pub trait FullStore: UserStore + PostStore + SocialStore + CategoryStore {}

impl<T: UserStore + PostStore + SocialStore + CategoryStore> FullStore for T {}
