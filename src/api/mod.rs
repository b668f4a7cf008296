// Moderation HTTP surface - routes mounted under /posts

pub mod dto;
pub mod extract;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::{app_state::AppState, infrastructure::middleware::viewer_context_middleware};
use handlers::*;

/// Moderation routes relative to their mount point, behind the viewer middleware.
pub fn create_moderation_router(state: AppState) -> Router {
    Router::new()
        // Moderation queues
        .route("/comments/non-approved", get(list_non_approved_handler))
        .route("/comments/ban", get(list_banned_handler))
        .route("/comments/reports", get(list_reported_handler))
        // Comment actions
        .route("/comments/ban/{id}", put(ban_comment_handler))
        .route("/comments/approve/{id}", put(approve_comment_handler))
        .route("/comments/reports/{id}", put(report_comment_handler))
        // Feeds; GET takes a post id, DELETE a comment id
        .route("/comments/private/{id}", get(list_private_comments_handler))
        .route(
            "/comments/{id}",
            get(list_public_comments_handler).delete(remove_comment_handler),
        )
        .route("/comments", post(create_comment_handler).put(update_comment_handler))
        // Replies
        .route("/replies", post(create_reply_handler).put(update_reply_handler))
        .route("/replies/ban/{id}", put(ban_reply_handler))
        .route("/replies/approve/{id}", put(approve_reply_handler))
        .route("/replies/reports/{id}", put(report_reply_handler))
        .route("/replies/{id}", delete(remove_reply_handler))
        // Fixture reset
        .route("/{id}", delete(remove_post_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .with_state(state)
}

/// Full application: moderation routes under `/posts` with permissive CORS.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/posts", create_moderation_router(state))
        .layer(CorsLayer::permissive())
}
