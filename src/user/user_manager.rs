use super::auth::SoundshareHasher;
use super::token::{AuthFailure, TokenIssuer};
use crate::media::{release_in_background, AudioRef, AudioStorage};
use crate::social::validation::{Validator, MIN_PASSWORD_LEN};
use crate::social::{run_store_call, ServiceError};
use crate::store::{
    FullStore, NewUser, PasswordCredentials, User, UserId, UserProfile, UserRole, UserStore,
    UserUpdate, UserUpdateOutcome,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub user_id: UserId,
    pub expires_in: u64,
    pub status: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

/// Hashes `password` with the current hasher, returning salt, hash and
/// hasher name.
pub fn hash_password(password: &str) -> Result<(String, String, String)> {
    let hasher = SoundshareHasher::current();
    let salt = hasher.generate_b64_salt();
    let hash = hasher.hash(password.as_bytes(), &salt)?;
    Ok((salt, hash, hasher.to_string()))
}

/// Validates signup fields and builds the user to insert.
pub fn new_user_from_signup(
    email: &str,
    name: &str,
    password: &str,
    role: UserRole,
) -> Result<NewUser, ServiceError> {
    let mut validator = Validator::new();
    let email = validator.email("email", email);
    let name = validator.not_empty("name", name);
    let password = validator.min_len("password", password, MIN_PASSWORD_LEN);
    validator.finish()?;

    let (salt, hash, hasher) = hash_password(&password)?;
    Ok(NewUser {
        email,
        name,
        role,
        salt,
        hash,
        hasher,
    })
}

/// Validates a new password for `user_id` and hashes it.
pub fn password_credentials(
    user_id: UserId,
    password: &str,
) -> Result<PasswordCredentials, ServiceError> {
    let mut validator = Validator::new();
    let password = validator.min_len("password", password, MIN_PASSWORD_LEN);
    validator.finish()?;

    let (salt, hash, hasher) = hash_password(&password)?;
    Ok(PasswordCredentials {
        user_id,
        salt,
        hash,
        hasher,
    })
}

pub struct UserManager {
    store: Arc<dyn FullStore>,
    audio: Arc<dyn AudioStorage>,
    tokens: TokenIssuer,
    store_timeout: Duration,
}

impl UserManager {
    pub fn new(
        store: Arc<dyn FullStore>,
        audio: Arc<dyn AudioStorage>,
        tokens: TokenIssuer,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            audio,
            tokens,
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

    pub async fn signup(
        &self,
        email: String,
        name: String,
        password: String,
    ) -> Result<UserId, ServiceError> {
        let user_id = self
            .call(move |store| {
                let new_user = new_user_from_signup(&email, &name, &password, UserRole::Regular)?;
                store
                    .create_user(&new_user)?
                    .ok_or(ServiceError::DuplicateEmail)
            })
            .await?;
        info!("Signed up user {}", user_id);
        Ok(user_id)
    }

    pub async fn login(&self, email: String, password: String) -> Result<LoginResult, ServiceError> {
        let user = self
            .call(move |store| {
                let email = email.trim().to_lowercase();
                let user = store
                    .get_user_by_email(&email)?
                    .ok_or(ServiceError::Unauthorized(AuthFailure::UnknownEmail))?;
                let credentials = store
                    .get_password_credentials(user.id)?
                    .ok_or(ServiceError::Unauthorized(AuthFailure::BadCredential))?;
                let hasher = SoundshareHasher::from_str(&credentials.hasher)?;
                if !hasher.verify(password.trim(), &credentials.hash)? {
                    return Err(ServiceError::Unauthorized(AuthFailure::BadCredential));
                }
                Ok(user)
            })
            .await?;

        let issued = self.tokens.issue(user.id, &user.email)?;
        Ok(LoginResult {
            token: issued.token,
            user_id: user.id,
            expires_in: issued.expires_in,
            status: user.status,
            role: user.role,
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<UserId, AuthFailure> {
        self.tokens.verify(token)
    }

    /// Resolves the acting user of a verified token. A token outliving its
    /// user is treated as invalid.
    pub async fn acting_user(&self, user_id: UserId) -> Result<User, ServiceError> {
        self.call(move |store| {
            store.get_user(user_id)?.ok_or_else(|| {
                ServiceError::Unauthorized(AuthFailure::InvalidToken(
                    "user no longer exists".to_string(),
                ))
            })
        })
        .await
    }

    pub async fn require_admin(&self, user_id: UserId) -> Result<User, ServiceError> {
        let user = self.acting_user(user_id).await?;
        if user.role != UserRole::Admin {
            return Err(ServiceError::Forbidden);
        }
        Ok(user)
    }

    pub async fn list_users(&self, acting: UserId) -> Result<Vec<UserProfile>, ServiceError> {
        self.require_admin(acting).await?;
        self.call(move |store| {
            let mut profiles = vec![];
            for user in store.get_all_users()? {
                if let Some(profile) = store.get_user_profile(user.id)? {
                    profiles.push(profile);
                }
            }
            Ok(profiles)
        })
        .await
    }

    /// Users may change their own profile, admins anyone's.
    pub async fn update_user(
        &self,
        acting: UserId,
        target: UserId,
        changes: ProfileChanges,
    ) -> Result<User, ServiceError> {
        if acting != target {
            self.require_admin(acting).await?;
        }

        let mut validator = Validator::new();
        let update = UserUpdate {
            email: changes.email.map(|email| validator.email("email", &email)),
            name: changes.name.map(|name| validator.not_empty("name", &name)),
            status: changes.status.map(|status| validator.not_empty("status", &status)),
        };
        validator.finish()?;

        self.call(move |store| match store.update_user(target, &update)? {
            UserUpdateOutcome::Updated(user) => Ok(user),
            UserUpdateOutcome::UserNotFound => Err(ServiceError::user_not_found()),
            UserUpdateOutcome::EmailTaken => Err(ServiceError::DuplicateEmail),
        })
        .await
    }

    /// Deletes a user with everything it owns. Audio files of its posts are
    /// released in the background.
    pub async fn delete_user(&self, acting: UserId, target: UserId) -> Result<(), ServiceError> {
        self.require_admin(acting).await?;
        let deleted = self
            .call(move |store| {
                store
                    .delete_user(target)
                    .with_context(|| format!("Failed to delete user {}", target))?
                    .ok_or_else(ServiceError::user_not_found)
            })
            .await?;
        info!(
            "User {} deleted user {} ({})",
            acting, target, deleted.user.email
        );
        release_in_background(
            self.audio.clone(),
            deleted.audio_refs.into_iter().map(AudioRef).collect(),
        );
        Ok(())
    }
}
