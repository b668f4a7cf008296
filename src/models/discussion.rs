// Discussion entities - posts, comments, replies and their moderation records

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::role::Role;
use crate::error::{AppError, AppResult};

static POST_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+$").expect("valid regex"));

/// Client supplied post identifier. Posts exist implicitly once commented on,
/// so the id is whatever the content page uses, minus whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn parse(raw: impl Into<String>) -> AppResult<Self> {
        let raw = raw.into();
        if !POST_ID_PATTERN.is_match(&raw) {
            return Err(AppError::Validation(
                "postId must be non-empty and cannot contain spaces".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub created_at: DateTime<Utc>,
}

/// Exactly one of customer or manager authored a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    Customer { id: Uuid },
    Manager { id: Uuid, role: Role },
}

impl Author {
    pub fn id(&self) -> Uuid {
        match self {
            Author::Customer { id } | Author::Manager { id, .. } => *id,
        }
    }

    pub fn customer_id(&self) -> Option<Uuid> {
        match self {
            Author::Customer { id } => Some(*id),
            Author::Manager { .. } => None,
        }
    }

    pub fn manager_id(&self) -> Option<Uuid> {
        match self {
            Author::Manager { id, .. } => Some(*id),
            Author::Customer { .. } => None,
        }
    }

    /// Role of a manager author; customers carry no staff role.
    pub fn manager_role(&self) -> Option<Role> {
        match self {
            Author::Manager { role, .. } => Some(*role),
            Author::Customer { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: Uuid,
    pub approver_id: Uuid,
    pub approved_at: DateTime<Utc>,
}

impl Approval {
    pub fn new(approver_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            approver_id,
            approved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: PostId,
    pub description: String,
    pub author: Author,
    pub is_banned: bool,
    pub approval: Option<Approval>,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub description: String,
    pub author: Author,
    pub is_banned: bool,
    pub approval: Option<Approval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub description: String,
    pub author: Author,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub comment_id: Uuid,
    pub description: String,
    pub author: Author,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Comment,
    Reply,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Comment => "comment",
            ContentKind::Reply => "reply",
        }
    }
}

/// Address of a comment or a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: Uuid,
}

impl ContentRef {
    pub fn comment(id: Uuid) -> Self {
        Self { kind: ContentKind::Comment, id }
    }

    pub fn reply(id: Uuid) -> Self {
        Self { kind: ContentKind::Reply, id }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target: ContentRef,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(target: ContentRef, reporter_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            reporter_id,
            target,
            created_at: Utc::now(),
        }
    }
}

/// One reported comment or reply with the number of open reports against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedItem {
    pub target: ContentRef,
    pub first_report: Report,
    pub comment: Option<Comment>,
    pub reply: Option<Reply>,
    pub reports_amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentsAndReplies {
    pub comments: Vec<Comment>,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Draft,
    Approved,
    Banned,
}

/// Moderation view shared by comments and replies.
pub trait Moderated {
    fn author(&self) -> &Author;
    fn is_banned(&self) -> bool;
    fn approval(&self) -> Option<&Approval>;

    fn is_approved(&self) -> bool {
        self.approval().is_some()
    }

    fn state(&self) -> ModerationState {
        if self.is_banned() {
            ModerationState::Banned
        } else if self.is_approved() {
            ModerationState::Approved
        } else {
            ModerationState::Draft
        }
    }
}

impl Moderated for Comment {
    fn author(&self) -> &Author {
        &self.author
    }

    fn is_banned(&self) -> bool {
        self.is_banned
    }

    fn approval(&self) -> Option<&Approval> {
        self.approval.as_ref()
    }
}

impl Moderated for Reply {
    fn author(&self) -> &Author {
        &self.author
    }

    fn is_banned(&self) -> bool {
        self.is_banned
    }

    fn approval(&self) -> Option<&Approval> {
        self.approval.as_ref()
    }
}

/// Trims a description and rejects it when nothing is left.
pub fn validate_description(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("description must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(is_banned: bool, approval: Option<Approval>) -> Reply {
        Reply {
            id: Uuid::new_v4(),
            comment_id: Uuid::new_v4(),
            description: "ok".to_string(),
            author: Author::Customer { id: Uuid::new_v4() },
            is_banned,
            approval,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_post_id_rejects_whitespace() {
        assert!(PostId::parse("lesson-42").is_ok());
        assert!(PostId::parse("lesson 42").is_err());
        assert!(PostId::parse("").is_err());
    }

    #[test]
    fn test_author_fields_are_exclusive() {
        let customer = Author::Customer { id: Uuid::new_v4() };
        assert!(customer.customer_id().is_some() && customer.manager_id().is_none());

        let manager = Author::Manager { id: Uuid::new_v4(), role: Role::ContentCreator };
        assert!(manager.manager_id().is_some() && manager.customer_id().is_none());
        assert_eq!(manager.manager_role(), Some(Role::ContentCreator));
    }

    #[test]
    fn test_moderation_state() {
        let approver = Uuid::new_v4();
        assert_eq!(reply(false, None).state(), ModerationState::Draft);
        assert_eq!(reply(false, Some(Approval::new(approver))).state(), ModerationState::Approved);
        // A retained approval does not lift a ban
        assert_eq!(reply(true, Some(Approval::new(approver))).state(), ModerationState::Banned);
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description("  hello ").unwrap(), "hello");
        assert!(validate_description("   ").is_err());
    }
}
