mod models;
mod schema;
mod sqlite_store;
mod trait_def;

pub use models::*;
pub use schema::STORE_VERSIONED_SCHEMAS;
pub use sqlite_store::SqliteStore;
pub use trait_def::{CategoryStore, FullStore, PostStore, SocialStore, UserStore};
