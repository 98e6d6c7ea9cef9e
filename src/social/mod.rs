mod engine;
mod error;
pub mod playlists;
mod store_call;
pub mod validation;

pub use engine::{AudioUpload, CreatedPost, PostFields, SocialEngine};
pub use error::{FieldError, ServiceError};
pub use playlists::{PlaylistSelector, DEFAULT_PLAYLIST_NAME};
pub use store_call::run_store_call;
