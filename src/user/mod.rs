pub mod auth;
pub mod token;
mod user_manager;

pub use auth::SoundshareHasher;
pub use token::{AuthFailure, IssuedToken, TokenIssuer, MIN_SECRET_LEN};
pub use user_manager::{
    hash_password, new_user_from_signup, password_credentials, LoginResult, ProfileChanges,
    UserManager,
};
