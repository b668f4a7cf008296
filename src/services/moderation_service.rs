// ModerationService - comment/reply lifecycle, moderation actions and feeds
// Loads candidates from the store and applies the privacy predicates on top

use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    infrastructure::{
        store::{ContentQuery, DiscussionStore},
        viewer::Actor,
    },
    models::{
        author_slot_for_comment, author_slot_for_reply, validate_description, Approval, Author,
        AuthorSlot, Comment, CommentsAndReplies, ContentKind, ContentRef, Moderated, NewComment,
        NewReply, PostId, Reply, Report, ReportedItem, Role,
    },
    privacy::{can_remove, is_awaiting_review, is_owner, is_privately_visible, is_publicly_visible},
};

/// Optional narrowing of the public feed to top-level comments by one author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCommentFilter {
    pub customer_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
}

impl PublicCommentFilter {
    pub fn matches(&self, author: &Author) -> bool {
        self.customer_id.map_or(true, |id| author.customer_id() == Some(id))
            && self.manager_id.map_or(true, |id| author.manager_id() == Some(id))
    }
}

fn author_for(slot: AuthorSlot, actor: &Actor) -> Author {
    match slot {
        AuthorSlot::Customer => Author::Customer { id: actor.id },
        AuthorSlot::Manager => Author::Manager {
            id: actor.id,
            role: actor.role,
        },
    }
}

fn label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Comment => "Comment",
        ContentKind::Reply => "Reply",
    }
}

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn DiscussionStore>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn DiscussionStore>) -> Self {
        Self { store }
    }

    /// Loads either kind of content behind its moderation view.
    async fn load(&self, target: ContentRef) -> AppResult<Box<dyn Moderated + Send + Sync>> {
        let found: Option<Box<dyn Moderated + Send + Sync>> = match target.kind {
            ContentKind::Comment => self
                .store
                .find_comment(target.id)
                .await?
                .map(|comment| Box::new(comment) as Box<dyn Moderated + Send + Sync>),
            ContentKind::Reply => self
                .store
                .find_reply(target.id)
                .await?
                .map(|reply| Box::new(reply) as Box<dyn Moderated + Send + Sync>),
        };

        found.ok_or_else(|| AppError::NotFound(format!("{} does not exist", label(target.kind))))
    }

    // Authoring

    pub async fn create_comment(
        &self,
        actor: &Actor,
        post_id: PostId,
        description: &str,
    ) -> AppResult<Comment> {
        if actor.role == Role::Supervisor {
            tracing::warn!(actor = %actor.id, "supervisor tried to author a comment");
            return Err(AppError::Forbidden(
                "Supervisors cannot author comments".to_string(),
            ));
        }
        let description = validate_description(description)?;

        self.store.get_or_create_post(&post_id).await?;
        let author = author_for(author_slot_for_comment(actor.role), actor);
        let comment = self
            .store
            .insert_comment(NewComment {
                post_id,
                description,
                author,
            })
            .await?;

        tracing::info!(
            comment = %comment.id,
            post = %comment.post_id,
            actor = %actor.id,
            role = %actor.role,
            "comment created"
        );
        Ok(comment)
    }

    pub async fn create_reply(
        &self,
        actor: &Actor,
        comment_id: Uuid,
        description: &str,
    ) -> AppResult<Reply> {
        let description = validate_description(description)?;

        let parent = self
            .store
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment does not exist".to_string()))?;

        if parent.author.manager_role() == Some(Role::ContentCreator) && !parent.is_approved() {
            tracing::warn!(comment = %comment_id, actor = %actor.id, "reply to unapproved comment rejected");
            return Err(AppError::Validation(
                "You can't reply to a comment that is not approved".to_string(),
            ));
        }

        let author = author_for(author_slot_for_reply(actor.role), actor);
        let reply = self
            .store
            .insert_reply(NewReply {
                comment_id,
                description,
                author,
            })
            .await?;

        tracing::info!(reply = %reply.id, comment = %comment_id, actor = %actor.id, "reply created");
        Ok(reply)
    }

    // Feeds

    /// Public feed of a post. Unknown posts yield an empty list.
    pub async fn list_public_comments(
        &self,
        post_id: &PostId,
        filter: PublicCommentFilter,
    ) -> AppResult<Vec<Comment>> {
        if self.store.find_post(post_id).await?.is_none() {
            return Ok(Vec::new());
        }

        let mut comments = self.store.list_post_comments(post_id).await?;
        comments.retain(|comment| is_publicly_visible(comment) && filter.matches(&comment.author));
        for comment in &mut comments {
            comment.replies.retain(|reply| is_publicly_visible(reply));
        }

        tracing::debug!(post = %post_id, count = comments.len(), "public comments listed");
        Ok(comments)
    }

    /// Private feed of a post for one manager. Unknown posts yield an empty list.
    pub async fn list_private_comments(
        &self,
        post_id: &PostId,
        viewer_id: Uuid,
    ) -> AppResult<Vec<Comment>> {
        if self.store.find_post(post_id).await?.is_none() {
            return Ok(Vec::new());
        }

        let mut comments = self.store.list_post_comments(post_id).await?;
        comments.retain(|comment| is_privately_visible(comment, viewer_id));
        for comment in &mut comments {
            comment.replies.retain(|reply| is_privately_visible(reply, viewer_id));
        }

        tracing::debug!(post = %post_id, viewer = %viewer_id, count = comments.len(), "private comments listed");
        Ok(comments)
    }

    /// Supervisor queue of unapproved content-creator content.
    pub async fn list_non_approved(&self) -> AppResult<CommentsAndReplies> {
        let query = ContentQuery::unapproved_and_not_banned();
        let (comments, replies) = futures::try_join!(
            self.store.list_comments(query),
            self.store.list_replies(query)
        )?;

        Ok(CommentsAndReplies {
            comments: comments.into_iter().filter(|c| is_awaiting_review(c)).collect(),
            replies: replies.into_iter().filter(|r| is_awaiting_review(r)).collect(),
        })
    }

    pub async fn list_banned(&self) -> AppResult<CommentsAndReplies> {
        let query = ContentQuery::banned();
        let (comments, replies) = futures::try_join!(
            self.store.list_comments(query),
            self.store.list_replies(query)
        )?;
        Ok(CommentsAndReplies { comments, replies })
    }

    /// Open reports grouped per target, in the order each target was first reported.
    pub async fn list_reported(&self) -> AppResult<Vec<ReportedItem>> {
        let reports = self.store.list_reports().await?;

        let mut grouped: Vec<ReportedItem> = Vec::new();
        for report in reports {
            if let Some(existing) = grouped.iter_mut().find(|item| item.target == report.target) {
                existing.reports_amount += 1;
                continue;
            }

            let (comment, reply) = match report.target.kind {
                ContentKind::Comment => (self.store.find_comment(report.target.id).await?, None),
                ContentKind::Reply => (None, self.store.find_reply(report.target.id).await?),
            };
            grouped.push(ReportedItem {
                target: report.target,
                first_report: report,
                comment,
                reply,
                reports_amount: 1,
            });
        }

        Ok(grouped)
    }

    // Moderation actions

    pub async fn approve(&self, target: ContentRef, actor: &Actor) -> AppResult<()> {
        let item = self.load(target).await?;
        if item.is_banned() && !actor.is_administrator() {
            tracing::warn!(content = %target, actor = %actor.id, "approval of banned content rejected");
            return Err(AppError::Validation(format!(
                "You can't approve a banned {}",
                target.kind.as_str()
            )));
        }

        self.store.approve(target, Approval::new(actor.id)).await?;
        tracing::info!(
            content = %target,
            approver = %actor.id,
            role = %actor.role,
            previous = ?item.state(),
            "content approved"
        );
        Ok(())
    }

    pub async fn ban(&self, target: ContentRef) -> AppResult<()> {
        let item = self.load(target).await?;
        if item.is_banned() {
            tracing::warn!(content = %target, "content already banned");
            return Err(AppError::Validation(format!(
                "This {} is already banned",
                target.kind.as_str()
            )));
        }

        self.store.ban(target).await?;
        tracing::info!(content = %target, "content banned");
        Ok(())
    }

    pub async fn report(&self, target: ContentRef, reporter_id: Uuid) -> AppResult<Report> {
        self.load(target).await?;

        // Read-then-write; concurrent duplicates from one reporter are tolerated
        if self.store.count_reports(target, Some(reporter_id)).await? > 0 {
            tracing::warn!(content = %target, reporter = %reporter_id, "duplicate report rejected");
            return Err(AppError::Validation(format!(
                "You have already reported this {}",
                target.kind.as_str()
            )));
        }

        let report = self.store.insert_report(Report::new(target, reporter_id)).await?;
        tracing::info!(content = %target, reporter = %reporter_id, "content reported");
        Ok(report)
    }

    /// Edits the description. A Supervisor edit also drops any approval.
    pub async fn update(&self, target: ContentRef, description: &str, actor: &Actor) -> AppResult<()> {
        let description = validate_description(description)?;
        let item = self.load(target).await?;
        if !is_owner(item.as_ref(), actor) {
            tracing::warn!(content = %target, actor = %actor.id, "edit by non-owner rejected");
            return Err(AppError::Forbidden(format!(
                "You can't update another user's {}",
                target.kind.as_str()
            )));
        }

        let drop_approval = actor.role == Role::Supervisor;
        self.store
            .update_description(target, &description, drop_approval)
            .await?;
        tracing::info!(
            content = %target,
            actor = %actor.id,
            previous = ?item.state(),
            approval_dropped = drop_approval,
            "content updated"
        );
        Ok(())
    }

    /// Edits a comment and returns it as stored afterwards.
    pub async fn update_comment(
        &self,
        id: Uuid,
        description: &str,
        actor: &Actor,
    ) -> AppResult<Comment> {
        self.update(ContentRef::comment(id), description, actor).await?;
        self.store
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment does not exist".to_string()))
    }

    /// Edits a reply and returns it as stored afterwards.
    pub async fn update_reply(&self, id: Uuid, description: &str, actor: &Actor) -> AppResult<Reply> {
        self.update(ContentRef::reply(id), description, actor).await?;
        self.store
            .find_reply(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reply does not exist".to_string()))
    }

    pub async fn remove(&self, target: ContentRef, actor: &Actor) -> AppResult<()> {
        let item = self.load(target).await?;
        if !can_remove(item.as_ref(), actor) {
            tracing::warn!(content = %target, actor = %actor.id, "removal by non-owner rejected");
            return Err(AppError::Forbidden(format!(
                "You can't remove another user's {}",
                target.kind.as_str()
            )));
        }

        self.store.delete_content(target).await?;
        tracing::info!(content = %target, actor = %actor.id, "content removed");
        Ok(())
    }

    /// Deletes a post and everything under it. Used to reset test fixtures.
    pub async fn remove_post(&self, post_id: &PostId) -> AppResult<()> {
        if !self.store.delete_post(post_id).await? {
            return Err(AppError::NotFound(format!("Post {} does not exist", post_id)));
        }
        tracing::info!(post = %post_id, "post removed");
        Ok(())
    }
}
