// In-memory discussion store - used by unit tests and local demos

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{ContentQuery, DiscussionStore};
use crate::models::{
    Approval, Comment, ContentKind, ContentRef, NewComment, NewReply, Post, PostId, Reply, Report,
};

#[derive(Default)]
struct Tables {
    posts: Vec<Post>,
    // Stored without replies; replies are attached on read.
    comments: Vec<Comment>,
    replies: Vec<Reply>,
    reports: Vec<Report>,
}

impl Tables {
    fn with_replies(&self, comment: &Comment) -> Comment {
        let mut loaded = comment.clone();
        loaded.replies = self
            .replies
            .iter()
            .filter(|reply| reply.comment_id == comment.id)
            .cloned()
            .collect();
        loaded
    }

    fn purge_reports(&mut self, target: ContentRef) {
        self.reports.retain(|report| report.target != target);
    }

    fn remove_comment(&mut self, id: Uuid) -> bool {
        let before = self.comments.len();
        self.comments.retain(|comment| comment.id != id);
        if self.comments.len() == before {
            return false;
        }

        let reply_ids: Vec<Uuid> = self
            .replies
            .iter()
            .filter(|reply| reply.comment_id == id)
            .map(|reply| reply.id)
            .collect();
        self.replies.retain(|reply| reply.comment_id != id);
        self.reports.retain(|report| match report.target.kind {
            ContentKind::Comment => report.target.id != id,
            ContentKind::Reply => !reply_ids.contains(&report.target.id),
        });
        true
    }

    fn remove_reply(&mut self, id: Uuid) -> bool {
        let before = self.replies.len();
        self.replies.retain(|reply| reply.id != id);
        if self.replies.len() == before {
            return false;
        }
        self.purge_reports(ContentRef::reply(id));
        true
    }
}

/// `DiscussionStore` over plain vectors behind a tokio `RwLock`.
#[derive(Default)]
pub struct InMemoryDiscussionStore {
    tables: RwLock<Tables>,
}

impl InMemoryDiscussionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(target: ContentRef) -> AppError {
    AppError::NotFound(format!("{} does not exist", target))
}

#[async_trait]
impl DiscussionStore for InMemoryDiscussionStore {
    async fn get_or_create_post(&self, post_id: &PostId) -> AppResult<Post> {
        let mut tables = self.tables.write().await;
        if let Some(post) = tables.posts.iter().find(|post| &post.id == post_id) {
            return Ok(post.clone());
        }
        let post = Post {
            id: post_id.clone(),
            created_at: Utc::now(),
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: &PostId) -> AppResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|post| &post.id == post_id).cloned())
    }

    async fn delete_post(&self, post_id: &PostId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| &post.id != post_id);
        if tables.posts.len() == before {
            return Ok(false);
        }

        let comment_ids: Vec<Uuid> = tables
            .comments
            .iter()
            .filter(|comment| &comment.post_id == post_id)
            .map(|comment| comment.id)
            .collect();
        for id in comment_ids {
            tables.remove_comment(id);
        }
        Ok(true)
    }

    async fn insert_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|post| post.id == comment.post_id) {
            return Err(AppError::NotFound(format!("post {} does not exist", comment.post_id)));
        }

        let now = Utc::now();
        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            description: comment.description,
            author: comment.author,
            is_banned: false,
            approval: None,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.comments.push(created.clone());
        Ok(created)
    }

    async fn insert_reply(&self, reply: NewReply) -> AppResult<Reply> {
        let mut tables = self.tables.write().await;
        if !tables.comments.iter().any(|comment| comment.id == reply.comment_id) {
            return Err(missing(ContentRef::comment(reply.comment_id)));
        }

        let now = Utc::now();
        let created = Reply {
            id: Uuid::new_v4(),
            comment_id: reply.comment_id,
            description: reply.description,
            author: reply.author,
            is_banned: false,
            approval: None,
            created_at: now,
            updated_at: now,
        };
        tables.replies.push(created.clone());
        Ok(created)
    }

    async fn find_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .map(|comment| tables.with_replies(comment)))
    }

    async fn find_reply(&self, id: Uuid) -> AppResult<Option<Reply>> {
        let tables = self.tables.read().await;
        Ok(tables.replies.iter().find(|reply| reply.id == id).cloned())
    }

    async fn list_post_comments(&self, post_id: &PostId) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| &comment.post_id == post_id)
            .map(|comment| tables.with_replies(comment))
            .collect())
    }

    async fn list_comments(&self, query: ContentQuery) -> AppResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| query.matches(comment.is_banned, comment.approval.is_some()))
            .cloned()
            .collect())
    }

    async fn list_replies(&self, query: ContentQuery) -> AppResult<Vec<Reply>> {
        let tables = self.tables.read().await;
        Ok(tables
            .replies
            .iter()
            .filter(|reply| query.matches(reply.is_banned, reply.approval.is_some()))
            .cloned()
            .collect())
    }

    async fn update_description(
        &self,
        target: ContentRef,
        description: &str,
        drop_approval: bool,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        match target.kind {
            ContentKind::Comment => {
                let comment = tables
                    .comments
                    .iter_mut()
                    .find(|comment| comment.id == target.id)
                    .ok_or_else(|| missing(target))?;
                comment.description = description.to_string();
                comment.updated_at = now;
                if drop_approval {
                    comment.approval = None;
                }
            }
            ContentKind::Reply => {
                let reply = tables
                    .replies
                    .iter_mut()
                    .find(|reply| reply.id == target.id)
                    .ok_or_else(|| missing(target))?;
                reply.description = description.to_string();
                reply.updated_at = now;
                if drop_approval {
                    reply.approval = None;
                }
            }
        }
        Ok(())
    }

    async fn approve(&self, target: ContentRef, approval: Approval) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        match target.kind {
            ContentKind::Comment => {
                let comment = tables
                    .comments
                    .iter_mut()
                    .find(|comment| comment.id == target.id)
                    .ok_or_else(|| missing(target))?;
                comment.is_banned = false;
                comment.approval = Some(approval);
                comment.updated_at = now;
            }
            ContentKind::Reply => {
                let reply = tables
                    .replies
                    .iter_mut()
                    .find(|reply| reply.id == target.id)
                    .ok_or_else(|| missing(target))?;
                reply.is_banned = false;
                reply.approval = Some(approval);
                reply.updated_at = now;
            }
        }
        tables.purge_reports(target);
        Ok(())
    }

    async fn ban(&self, target: ContentRef) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        match target.kind {
            ContentKind::Comment => {
                let comment = tables
                    .comments
                    .iter_mut()
                    .find(|comment| comment.id == target.id)
                    .ok_or_else(|| missing(target))?;
                comment.is_banned = true;
                comment.updated_at = now;
            }
            ContentKind::Reply => {
                let reply = tables
                    .replies
                    .iter_mut()
                    .find(|reply| reply.id == target.id)
                    .ok_or_else(|| missing(target))?;
                reply.is_banned = true;
                reply.updated_at = now;
            }
        }
        tables.purge_reports(target);
        Ok(())
    }

    async fn count_reports(&self, target: ContentRef, reporter_id: Option<Uuid>) -> AppResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .reports
            .iter()
            .filter(|report| report.target == target)
            .filter(|report| reporter_id.map_or(true, |id| report.reporter_id == id))
            .count();
        Ok(count as u64)
    }

    async fn insert_report(&self, report: Report) -> AppResult<Report> {
        let mut tables = self.tables.write().await;
        tables.reports.push(report.clone());
        Ok(report)
    }

    async fn list_reports(&self) -> AppResult<Vec<Report>> {
        let tables = self.tables.read().await;
        Ok(tables.reports.clone())
    }

    async fn delete_content(&self, target: ContentRef) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match target.kind {
            ContentKind::Comment => tables.remove_comment(target.id),
            ContentKind::Reply => tables.remove_reply(target.id),
        })
    }
}
