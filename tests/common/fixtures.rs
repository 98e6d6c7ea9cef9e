//! Test fixture creation for the database

use super::constants::*;
use anyhow::{anyhow, Result};
use soundshare_server::store::{CategoryStore, SqliteStore, UserRole, UserStore};
use soundshare_server::user::new_user_from_signup;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Bytes sniffed as `audio/mpeg`: an ID3v2 header followed by padding.
pub fn mp3_bytes() -> Vec<u8> {
    let mut bytes = b"ID3\x03\x00\x00\x00\x00\x00\x0a".to_vec();
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

fn add_user(
    store: &SqliteStore,
    email: &str,
    name: &str,
    password: &str,
    role: UserRole,
) -> Result<()> {
    let new_user = new_user_from_signup(email, name, password, role)
        .map_err(|e| anyhow!("invalid fixture user {}: {}", email, e))?;
    store
        .create_user(&new_user)?
        .ok_or_else(|| anyhow!("fixture user {} already exists", email))?;
    Ok(())
}

/// Creates a temporary database with a regular user, a second regular user,
/// an admin and two categories.
/// Returns (temp_dir, db_path, store)
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf, SqliteStore)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("soundshare.db");
    let store = SqliteStore::new(&db_path, Duration::from_secs(5))?;

    add_user(&store, TEST_USER, TEST_USER_NAME, TEST_PASS, UserRole::Regular)?;
    add_user(&store, OTHER_USER, OTHER_USER_NAME, OTHER_PASS, UserRole::Regular)?;
    add_user(&store, ADMIN_USER, "Admin", ADMIN_PASS, UserRole::Admin)?;

    store.create_category(ROCK_CATEGORY)?;
    store.create_category(JAZZ_CATEGORY)?;

    Ok((dir, db_path, store))
}
