pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;
pub mod todo;

pub use app_state::AppState;
pub use config::Config;
