// Discussion store - persistence contract consumed by the moderation service

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Approval, Comment, ContentRef, NewComment, NewReply, Post, PostId, Reply, Report,
};

/// Declarative filter pushed down to the store. `None` leaves a column unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentQuery {
    pub is_banned: Option<bool>,
    pub has_approval: Option<bool>,
}

impl ContentQuery {
    pub fn banned() -> Self {
        Self {
            is_banned: Some(true),
            has_approval: None,
        }
    }

    pub fn unapproved_and_not_banned() -> Self {
        Self {
            is_banned: Some(false),
            has_approval: Some(false),
        }
    }

    pub fn matches(&self, is_banned: bool, has_approval: bool) -> bool {
        self.is_banned.map_or(true, |wanted| wanted == is_banned)
            && self.has_approval.map_or(true, |wanted| wanted == has_approval)
    }
}

/// Persistence operations for posts, comments, replies, approvals and reports.
///
/// Every multi-row write (approve, ban, edit with approval drop, delete) is a single
/// call so implementations can apply it atomically.
#[async_trait]
pub trait DiscussionStore: Send + Sync {
    /// Returns the post, inserting it first if this id was never seen.
    async fn get_or_create_post(&self, post_id: &PostId) -> AppResult<Post>;
    async fn find_post(&self, post_id: &PostId) -> AppResult<Option<Post>>;
    /// Deletes the post together with its comments, replies, approvals and reports.
    async fn delete_post(&self, post_id: &PostId) -> AppResult<bool>;

    async fn insert_comment(&self, comment: NewComment) -> AppResult<Comment>;
    async fn insert_reply(&self, reply: NewReply) -> AppResult<Reply>;

    /// Loads a comment with its approval and all of its replies.
    async fn find_comment(&self, id: Uuid) -> AppResult<Option<Comment>>;
    async fn find_reply(&self, id: Uuid) -> AppResult<Option<Reply>>;

    /// All comments of a post in creation order, each with every reply loaded.
    async fn list_post_comments(&self, post_id: &PostId) -> AppResult<Vec<Comment>>;
    /// Comments across all posts matching the query; replies are not loaded.
    async fn list_comments(&self, query: ContentQuery) -> AppResult<Vec<Comment>>;
    async fn list_replies(&self, query: ContentQuery) -> AppResult<Vec<Reply>>;

    /// Replaces the description, dropping any approval when `drop_approval` is set.
    async fn update_description(
        &self,
        target: ContentRef,
        description: &str,
        drop_approval: bool,
    ) -> AppResult<()>;

    /// Clears the ban flag, records `approval` in place of any earlier one and
    /// purges every report on the target.
    async fn approve(&self, target: ContentRef, approval: Approval) -> AppResult<()>;
    /// Sets the ban flag and purges every report on the target.
    async fn ban(&self, target: ContentRef) -> AppResult<()>;

    /// Number of reports on `target`, optionally restricted to one reporter.
    async fn count_reports(&self, target: ContentRef, reporter_id: Option<Uuid>) -> AppResult<u64>;
    async fn insert_report(&self, report: Report) -> AppResult<Report>;
    /// Every report in the order it was filed.
    async fn list_reports(&self) -> AppResult<Vec<Report>>;

    /// Deletes a comment or reply and everything hanging off it.
    async fn delete_content(&self, target: ContentRef) -> AppResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_query_matches() {
        assert!(ContentQuery::default().matches(true, false));
        assert!(ContentQuery::banned().matches(true, true));
        assert!(!ContentQuery::banned().matches(false, true));

        let queue = ContentQuery::unapproved_and_not_banned();
        assert!(queue.matches(false, false));
        assert!(!queue.matches(false, true));
        assert!(!queue.matches(true, false));
    }
}
