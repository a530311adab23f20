// Library root for the lingo REST API

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod scoring;
pub mod storage;
pub mod upload;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use app::{create_router, AppState};
pub use db::Database;
pub use error::ApiError;
pub use models::{Article, Quiz, QuizKind, User};
