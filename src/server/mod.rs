mod auth_routes;
mod category_routes;
pub mod config;
mod errors;
mod feed_routes;
mod http_layers;
mod json_body;
pub mod server;
pub(self) mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::{Session, COOKIE_SESSION_TOKEN_KEY};
