// HTTP handlers for the moderation routes
// Each handler applies its role gate, then delegates to ModerationService

use axum::{extract::State, http::StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use super::dto::{
    ContentView, CreateCommentRequest, CreateReplyRequest, ReportView, UpdateCommentRequest,
    UpdateReplyRequest,
};
use crate::{
    app_state::AppState,
    error::AppError,
    infrastructure::{MaybeVc, Vc},
    models::{CommentsAndReplies, ContentRef, PostId},
    privacy::RouteAccess,
    services::PublicCommentFilter,
};

fn comments_and_replies(lists: &CommentsAndReplies) -> Value {
    let comments: Vec<ContentView> = lists
        .comments
        .iter()
        .map(|comment| {
            let mut view = ContentView::from(comment);
            view.replies = None;
            view
        })
        .collect();
    let replies: Vec<ContentView> = lists.replies.iter().map(ContentView::from).collect();
    json!({ "comments": comments, "replies": replies })
}

// Moderation queues

pub async fn list_non_approved_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> Result<Json<Value>, AppError> {
    RouteAccess::ListNonApproved.check(&vc.actor)?;
    let lists = state.moderation.list_non_approved().await?;
    Ok(Json(comments_and_replies(&lists)))
}

pub async fn list_banned_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> Result<Json<Value>, AppError> {
    RouteAccess::ListBanned.check(&vc.actor)?;
    let lists = state.moderation.list_banned().await?;
    Ok(Json(comments_and_replies(&lists)))
}

pub async fn list_reported_handler(
    State(state): State<AppState>,
    vc: Vc,
) -> Result<Json<Value>, AppError> {
    RouteAccess::ListReported.check(&vc.actor)?;
    let reported = state.moderation.list_reported().await?;
    let reports: Vec<ReportView> = reported.iter().map(ReportView::from).collect();
    Ok(Json(json!({ "reports": reports })))
}

// Feeds

pub async fn list_public_comments_handler(
    State(state): State<AppState>,
    MaybeVc(viewer): MaybeVc,
    Path(post_id): Path<String>,
    Query(filter): Query<PublicCommentFilter>,
) -> Result<Json<Value>, AppError> {
    let post_id = PostId::parse(post_id)?;
    tracing::debug!(
        post = %post_id,
        viewer = ?viewer.as_ref().map(|vc| vc.actor.id),
        "public feed requested"
    );
    let comments = state.moderation.list_public_comments(&post_id, filter).await?;
    let comments: Vec<ContentView> = comments.iter().map(ContentView::from).collect();
    Ok(Json(json!({ "comments": comments })))
}

pub async fn list_private_comments_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(post_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    RouteAccess::ListPrivate.check(&vc.actor)?;
    let post_id = PostId::parse(post_id)?;
    let comments = state
        .moderation
        .list_private_comments(&post_id, vc.actor.id)
        .await?;
    let comments: Vec<ContentView> = comments.iter().map(ContentView::from).collect();
    Ok(Json(json!({ "comments": comments })))
}

// Comments

pub async fn create_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ContentView>), AppError> {
    RouteAccess::Author.check(&vc.actor)?;
    let post_id = PostId::parse(req.post_id)?;
    let comment = state
        .moderation
        .create_comment(&vc.actor, post_id, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(ContentView::from(&comment))))
}

pub async fn update_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<ContentView>, AppError> {
    RouteAccess::Author.check(&vc.actor)?;
    let comment = state
        .moderation
        .update_comment(req.comment_id, &req.description, &vc.actor)
        .await?;
    Ok(Json(ContentView::from(&comment)))
}

pub async fn remove_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Author.check(&vc.actor)?;
    state.moderation.remove(ContentRef::comment(id), &vc.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ban_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Ban.check(&vc.actor)?;
    state.moderation.ban(ContentRef::comment(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Approve.check(&vc.actor)?;
    state.moderation.approve(ContentRef::comment(id), &vc.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn report_comment_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Report.check(&vc.actor)?;
    state.moderation.report(ContentRef::comment(id), vc.actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Replies

pub async fn create_reply_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<ContentView>), AppError> {
    RouteAccess::Author.check(&vc.actor)?;
    let reply = state
        .moderation
        .create_reply(&vc.actor, req.comment_id, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(ContentView::from(&reply))))
}

pub async fn update_reply_handler(
    State(state): State<AppState>,
    vc: Vc,
    Json(req): Json<UpdateReplyRequest>,
) -> Result<Json<ContentView>, AppError> {
    RouteAccess::Author.check(&vc.actor)?;
    let reply = state
        .moderation
        .update_reply(req.reply_id, &req.description, &vc.actor)
        .await?;
    Ok(Json(ContentView::from(&reply)))
}

pub async fn remove_reply_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Author.check(&vc.actor)?;
    state.moderation.remove(ContentRef::reply(id), &vc.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ban_reply_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Ban.check(&vc.actor)?;
    state.moderation.ban(ContentRef::reply(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve_reply_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Approve.check(&vc.actor)?;
    state.moderation.approve(ContentRef::reply(id), &vc.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn report_reply_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    RouteAccess::Report.check(&vc.actor)?;
    state.moderation.report(ContentRef::reply(id), vc.actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Administration

pub async fn remove_post_handler(
    State(state): State<AppState>,
    vc: Vc,
    Path(post_id): Path<String>,
) -> Result<StatusCode, AppError> {
    RouteAccess::ResetPost.check(&vc.actor)?;
    let post_id = PostId::parse(post_id)?;
    state.moderation.remove_post(&post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
