//! Soundshare server library
//!
//! Audio-sharing backend: accounts, posts with uploaded audio, likes, plays,
//! comments and per-user playlists over one SQLite database.

pub mod config;
pub mod media;
pub mod server;
pub mod social;
pub mod sqlite_persistence;
pub mod store;
pub mod user;

// Re-export commonly used types for convenience
pub use server::{run_server, RequestsLoggingLevel};
pub use social::{ServiceError, SocialEngine};
pub use store::{SqliteStore, UserRole};
pub use user::UserManager;
