use super::models::*;
use super::schema::STORE_VERSIONED_SCHEMAS;
use super::trait_def::*;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

const USER_COLUMNS: &str = "u.id, u.email, u.name, u.status, u.role, u.created";
const POST_COLUMNS: &str =
    "p.id, p.title, p.description, p.category, p.audio, p.creator_id, p.likes, p.plays, p.created, p.updated";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        role: UserRole::from_str(&role).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, err.into())
        })?,
        created_at: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
    })
}

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        audio: row.get(4)?,
        creator: row.get(5)?,
        likes: row.get::<_, i64>(6)?.max(0) as u64,
        plays: row.get::<_, i64>(7)?.max(0) as u64,
        liked_by: vec![],
        comments: vec![],
        created_at: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<i64>>(9)?.unwrap_or_default(),
    })
}

fn user_exists(conn: &Connection, user_id: UserId) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM user WHERE id = ?1", params![user_id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn post_exists(conn: &Connection, post_id: PostId) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM post WHERE id = ?1", params![post_id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn read_user(conn: &Connection, user_id: UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM user u WHERE u.id = ?1", USER_COLUMNS),
        params![user_id],
        user_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to read user {}", user_id))
}

fn load_post_relations(conn: &Connection, post: &mut Post) -> Result<()> {
    post.liked_by = conn
        .prepare("SELECT user_id FROM post_like WHERE post_id = ?1 ORDER BY id")?
        .query_map(params![post.id], |row| row.get(0))?
        .collect::<Result<Vec<UserId>, _>>()?;
    post.comments = conn
        .prepare("SELECT id, text, author_name, created FROM comment WHERE post_id = ?1 ORDER BY id")?
        .query_map(params![post.id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                text: row.get(1)?,
                author_name: row.get(2)?,
                created_at: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<Comment>, _>>()?;
    Ok(())
}

fn read_post(conn: &Connection, post_id: PostId) -> Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM post p WHERE p.id = ?1", POST_COLUMNS),
            params![post_id],
            post_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to read post {}", post_id))?;
    match post {
        Some(mut post) => {
            load_post_relations(conn, &mut post)?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

fn read_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Post>> {
    let mut posts = conn
        .prepare(sql)?
        .query_map(params, post_from_row)?
        .collect::<Result<Vec<Post>, _>>()?;
    for post in posts.iter_mut() {
        load_post_relations(conn, post)?;
    }
    Ok(posts)
}

fn read_playlists(conn: &Connection, user_id: UserId) -> Result<Vec<Playlist>> {
    let mut playlists = conn
        .prepare("SELECT id, name FROM playlist WHERE user_id = ?1 ORDER BY position")?
        .query_map(params![user_id], |row| {
            Ok(Playlist {
                id: row.get(0)?,
                name: row.get(1)?,
                songs: vec![],
            })
        })?
        .collect::<Result<Vec<Playlist>, _>>()?;
    let mut songs_stmt =
        conn.prepare("SELECT post_id FROM playlist_song WHERE playlist_id = ?1 ORDER BY id")?;
    for playlist in playlists.iter_mut() {
        playlist.songs = songs_stmt
            .query_map(params![playlist.id], |row| row.get(0))?
            .collect::<Result<Vec<PostId>, _>>()?;
    }
    Ok(playlists)
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new<T: AsRef<Path>>(db_path: T, busy_timeout: Duration) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), STORE_VERSIONED_SCHEMAS, busy_timeout)?;
        info!("Opened store at {:?}", db_path.as_ref());
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Store connection lock poisoned"))
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, new_user: &NewUser) -> Result<Option<UserId>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let taken = tx
            .query_row(
                "SELECT 1 FROM user WHERE email = ?1",
                params![new_user.email],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO user (email, name, role) VALUES (?1, ?2, ?3)",
            params![new_user.email, new_user.name, new_user.role.to_db_str()],
        )
        .with_context(|| format!("Failed to create user {}", new_user.email))?;
        let user_id = tx.last_insert_rowid() as UserId;
        tx.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, new_user.salt, new_user.hash, new_user.hasher],
        )?;
        tx.commit()?;
        debug!("create_user({}) -> {}", new_user.email, user_id);
        Ok(Some(user_id))
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let conn = self.conn()?;
        read_user(&conn, user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM user u WHERE u.email = ?1", USER_COLUMNS),
            params![email],
            user_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to read user {}", email))
    }

    fn get_user_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let conn = self.conn()?;
        let user = match read_user(&conn, user_id)? {
            Some(user) => user,
            None => return Ok(None),
        };
        let posts = conn
            .prepare("SELECT id FROM post WHERE creator_id = ?1 ORDER BY id")?
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<PostId>, _>>()?;
        let library = conn
            .prepare("SELECT post_id FROM library_entry WHERE user_id = ?1 ORDER BY id")?
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<PostId>, _>>()?;
        let playlists = read_playlists(&conn, user_id)?;
        Ok(Some(UserProfile {
            user,
            posts,
            library,
            playlists,
        }))
    }

    fn get_all_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let users = conn
            .prepare(&format!("SELECT {} FROM user u ORDER BY u.id", USER_COLUMNS))?
            .query_map([], user_from_row)?
            .collect::<Result<Vec<User>, _>>()?;
        Ok(users)
    }

    fn get_password_credentials(&self, user_id: UserId) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT user_id, salt, hash, hasher FROM user_password_credentials WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(PasswordCredentials {
                    user_id: row.get(0)?,
                    salt: row.get(1)?,
                    hash: row.get(2)?,
                    hasher: row.get(3)?,
                })
            },
        )
        .optional()
        .with_context(|| format!("Failed to read credentials of user {}", user_id))
    }

    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<bool> {
        let conn = self.conn()?;
        if !user_exists(&conn, credentials.user_id)? {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher
            ],
        )?;
        Ok(true)
    }

    fn update_user(&self, user_id: UserId, update: &UserUpdate) -> Result<UserUpdateOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !user_exists(&tx, user_id)? {
            return Ok(UserUpdateOutcome::UserNotFound);
        }
        if let Some(email) = &update.email {
            let taken = tx
                .query_row(
                    "SELECT 1 FROM user WHERE email = ?1 AND id != ?2",
                    params![email, user_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if taken {
                return Ok(UserUpdateOutcome::EmailTaken);
            }
        }

        tx.execute(
            "UPDATE user SET email = COALESCE(?1, email), name = COALESCE(?2, name), status = COALESCE(?3, status) WHERE id = ?4",
            params![update.email, update.name, update.status, user_id],
        )?;
        let user = read_user(&tx, user_id)?.context("User vanished during update")?;
        tx.commit()?;
        Ok(UserUpdateOutcome::Updated(user))
    }

    fn set_user_role(&self, user_id: UserId, role: UserRole) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE user SET role = ?1 WHERE id = ?2",
            params![role.to_db_str(), user_id],
        )?;
        Ok(updated > 0)
    }

    fn delete_user(&self, user_id: UserId) -> Result<Option<DeletedUser>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user = match read_user(&tx, user_id)? {
            Some(user) => user,
            None => return Ok(None),
        };
        let audio_refs = tx
            .prepare("SELECT audio FROM post WHERE creator_id = ?1 ORDER BY id")?
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        let released_likes = tx.execute(
            "UPDATE post SET likes = likes - 1
             WHERE likes > 0 AND id IN (SELECT post_id FROM post_like WHERE user_id = ?1)",
            params![user_id],
        )?;
        tx.execute("DELETE FROM user WHERE id = ?1", params![user_id])?;
        tx.commit()?;

        debug!(
            "delete_user({}) released {} likes, {} audio files",
            user_id,
            released_likes,
            audio_refs.len()
        );
        Ok(Some(DeletedUser { user, audio_refs }))
    }
}

impl PostStore for SqliteStore {
    fn create_post(&self, draft: &PostDraft) -> Result<Option<Post>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !user_exists(&tx, draft.creator)? {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO post (title, description, category, audio, creator_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.title,
                draft.description,
                draft.category,
                draft.audio,
                draft.creator
            ],
        )
        .context("Failed to insert post")?;
        let post_id = tx.last_insert_rowid() as PostId;
        let post = read_post(&tx, post_id)?;
        tx.commit()?;
        Ok(post)
    }

    fn get_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let conn = self.conn()?;
        read_post(&conn, post_id)
    }

    fn query_posts(&self, query: &PostQuery) -> Result<PostPage> {
        let conn = self.conn()?;
        let order = match query.sort {
            PostSort::Newest => "p.created DESC, p.id DESC",
            PostSort::MostLiked => "p.likes DESC, p.created DESC, p.id DESC",
        };
        let per_page = query.per_page.max(1);
        let offset = (query.page.max(1) - 1) * per_page;

        let total_items: i64 = conn.query_row(
            "SELECT COUNT(*) FROM post p WHERE (?1 IS NULL OR p.category = ?1)",
            params![query.category],
            |row| row.get(0),
        )?;
        let posts = read_posts(
            &conn,
            &format!(
                "SELECT {} FROM post p WHERE (?1 IS NULL OR p.category = ?1) ORDER BY {} LIMIT ?2 OFFSET ?3",
                POST_COLUMNS, order
            ),
            params![query.category, per_page as i64, offset as i64],
        )?;
        Ok(PostPage {
            posts,
            total_items: total_items as usize,
        })
    }

    fn update_post(&self, post_id: PostId, changes: &PostChanges) -> Result<Option<Post>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE post SET title = ?1, description = ?2, category = ?3, audio = COALESCE(?4, audio),
             updated = cast(strftime('%s','now') as int) WHERE id = ?5",
            params![
                changes.title,
                changes.description,
                changes.category,
                changes.audio,
                post_id
            ],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let post = read_post(&tx, post_id)?;
        tx.commit()?;
        Ok(post)
    }

    fn delete_post(&self, post_id: PostId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM post WHERE id = ?1", params![post_id])?;
        Ok(deleted > 0)
    }

    fn increment_plays(&self, post_id: PostId) -> Result<Option<Post>> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE post SET plays = plays + 1 WHERE id = ?1",
            params![post_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        read_post(&conn, post_id)
    }
}

impl SocialStore for SqliteStore {
    fn like_post(&self, user_id: UserId, post_id: PostId) -> Result<LikeOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !user_exists(&tx, user_id)? {
            return Ok(LikeOutcome::UserNotFound);
        }
        if !post_exists(&tx, post_id)? {
            return Ok(LikeOutcome::PostNotFound);
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO library_entry (user_id, post_id) VALUES (?1, ?2)",
            params![user_id, post_id],
        )?;
        if inserted == 1 {
            tx.execute(
                "INSERT INTO post_like (post_id, user_id) VALUES (?1, ?2)",
                params![post_id, user_id],
            )
            .with_context(|| format!("Post {} already liked by user {}", post_id, user_id))?;
            tx.execute(
                "UPDATE post SET likes = likes + 1 WHERE id = ?1",
                params![post_id],
            )?;
        }

        let post = read_post(&tx, post_id)?.context("Post vanished during like")?;
        tx.commit()?;
        if inserted == 1 {
            Ok(LikeOutcome::Liked(post))
        } else {
            Ok(LikeOutcome::AlreadyLiked(post))
        }
    }

    fn get_library(&self, user_id: UserId) -> Result<Option<Vec<Post>>> {
        let conn = self.conn()?;
        if !user_exists(&conn, user_id)? {
            return Ok(None);
        }
        let posts = read_posts(
            &conn,
            &format!(
                "SELECT {} FROM library_entry l JOIN post p ON p.id = l.post_id WHERE l.user_id = ?1 ORDER BY l.id",
                POST_COLUMNS
            ),
            params![user_id],
        )?;
        Ok(Some(posts))
    }

    fn get_playlists(&self, user_id: UserId) -> Result<Option<PlaylistsSnapshot>> {
        let conn = self.conn()?;
        let version: Option<i64> = conn
            .query_row(
                "SELECT playlists_version FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match version {
            Some(version) => Ok(Some(PlaylistsSnapshot {
                version,
                playlists: read_playlists(&conn, user_id)?,
            })),
            None => Ok(None),
        }
    }

    fn replace_playlists(
        &self,
        user_id: UserId,
        expected_version: i64,
        playlists: &[Playlist],
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let swapped = tx.execute(
            "UPDATE user SET playlists_version = playlists_version + 1 WHERE id = ?1 AND playlists_version = ?2",
            params![user_id, expected_version],
        )?;
        if swapped == 0 {
            debug!(
                "replace_playlists({}) version {} is stale",
                user_id, expected_version
            );
            return Ok(false);
        }

        tx.execute("DELETE FROM playlist WHERE user_id = ?1", params![user_id])?;
        {
            let mut playlist_stmt = tx.prepare(
                "INSERT INTO playlist (id, user_id, name, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut song_stmt = tx.prepare(
                "INSERT OR IGNORE INTO playlist_song (playlist_id, post_id) SELECT ?1, id FROM post WHERE id = ?2",
            )?;
            for (position, playlist) in playlists.iter().enumerate() {
                playlist_stmt
                    .execute(params![playlist.id, user_id, playlist.name, position as i64])
                    .with_context(|| format!("Failed to write playlist {}", playlist.id))?;
                for song in &playlist.songs {
                    song_stmt.execute(params![playlist.id, song])?;
                }
            }
        }
        tx.commit()?;
        Ok(true)
    }

    fn add_comment(
        &self,
        post_id: PostId,
        text: &str,
        author_name: &str,
    ) -> Result<Option<Comment>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if !post_exists(&tx, post_id)? {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO comment (post_id, text, author_name) VALUES (?1, ?2, ?3)",
            params![post_id, text, author_name],
        )?;
        let comment_id = tx.last_insert_rowid();
        let comment = tx.query_row(
            "SELECT id, text, author_name, created FROM comment WHERE id = ?1",
            params![comment_id],
            |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    author_name: row.get(2)?,
                    created_at: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                })
            },
        )?;
        tx.commit()?;
        Ok(Some(comment))
    }

    fn audit_like_counters(&self) -> Result<Vec<LikeCounterMismatch>> {
        let conn = self.conn()?;
        let rows = conn
            .prepare(
                "SELECT p.id, p.likes,
                    (SELECT COUNT(*) FROM post_like pl WHERE pl.post_id = p.id),
                    (SELECT COUNT(*) FROM library_entry l WHERE l.post_id = p.id)
                 FROM post p ORDER BY p.id",
            )?
            .query_map([], |row| {
                Ok(LikeCounterMismatch {
                    post_id: row.get(0)?,
                    likes: row.get::<_, i64>(1)?.max(0) as u64,
                    liked_by: row.get::<_, i64>(2)? as u64,
                    in_libraries: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter(|row| row.likes != row.liked_by || row.likes != row.in_libraries)
            .collect())
    }
}

impl CategoryStore for SqliteStore {
    fn get_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let categories = conn
            .prepare("SELECT id, name FROM category ORDER BY id")?
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn create_category(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO category (name) VALUES (?1)",
            params![name],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(Category {
            id: conn.last_insert_rowid() as usize,
            name: name.to_string(),
        }))
    }

    fn rename_category(&self, category_id: usize, name: &str) -> Result<CategoryRename> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists = tx
            .query_row(
                "SELECT 1 FROM category WHERE id = ?1",
                params![category_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(CategoryRename::NotFound);
        }
        let taken = tx
            .query_row(
                "SELECT 1 FROM category WHERE name = ?1 AND id != ?2",
                params![name, category_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Ok(CategoryRename::NameTaken);
        }
        tx.execute(
            "UPDATE category SET name = ?1 WHERE id = ?2",
            params![name, category_id],
        )?;
        tx.commit()?;
        Ok(CategoryRename::Renamed(Category {
            id: category_id,
            name: name.to_string(),
        }))
    }
}
