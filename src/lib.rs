// Comment Moderation - moderated comment/reply discussions attached to posts

// Domain model - roles, posts, comments, replies, approvals and reports
pub mod models;

// Visibility, ownership and role-gate predicates
pub mod privacy;

// Infrastructure - persistence, viewer context and access tokens
pub mod infrastructure;

// Business logic
pub mod services;

// HTTP surface
pub mod api;
pub mod app_state;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
