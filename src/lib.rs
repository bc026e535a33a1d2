pub mod analytics;
pub mod cache;
pub mod client;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod password;
pub mod redirect;
pub mod response;
pub mod server;
pub mod store;
pub mod user_agent;
pub mod validation;

pub use config::Config;
pub use error::{RedirectError, Result};
pub use handlers::AppState;
pub use server::create_app;
