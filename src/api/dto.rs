// Request bodies and JSON views for the moderation routes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Author, Comment, Moderated, Reply, ReportedItem, Role};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub description: String,
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub comment_id: Uuid,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub description: String,
    pub comment_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReplyRequest {
    pub reply_id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerView {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerView {
    pub id: Uuid,
    pub role: Role,
}

/// Comment or reply as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment_id: Option<Uuid>,
    pub description: String,
    pub customer: Option<CustomerView>,
    pub manager: Option<ManagerView>,
    pub is_banned: bool,
    pub is_approved: bool,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replies: Option<Vec<ContentView>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn author_views(author: &Author) -> (Option<CustomerView>, Option<ManagerView>) {
    match author {
        Author::Customer { id } => (Some(CustomerView { id: *id }), None),
        Author::Manager { id, role } => (None, Some(ManagerView { id: *id, role: *role })),
    }
}

impl From<&Comment> for ContentView {
    fn from(comment: &Comment) -> Self {
        let (customer, manager) = author_views(&comment.author);
        ContentView {
            id: comment.id,
            post_id: Some(comment.post_id.to_string()),
            comment_id: None,
            description: comment.description.clone(),
            customer,
            manager,
            is_banned: comment.is_banned,
            is_approved: comment.is_approved(),
            approved_by: comment.approval.as_ref().map(|a| a.approver_id),
            approved_at: comment.approval.as_ref().map(|a| a.approved_at),
            replies: Some(comment.replies.iter().map(ContentView::from).collect()),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl From<&Reply> for ContentView {
    fn from(reply: &Reply) -> Self {
        let (customer, manager) = author_views(&reply.author);
        ContentView {
            id: reply.id,
            post_id: None,
            comment_id: Some(reply.comment_id),
            description: reply.description.clone(),
            customer,
            manager,
            is_banned: reply.is_banned,
            is_approved: reply.is_approved(),
            approved_by: reply.approval.as_ref().map(|a| a.approver_id),
            approved_at: reply.approval.as_ref().map(|a| a.approved_at),
            replies: None,
            created_at: reply.created_at,
            updated_at: reply.updated_at,
        }
    }
}

/// One reported item with its report count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    /// Id of the first report filed against the item
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub comment_id: Option<Uuid>,
    pub reply_id: Option<Uuid>,
    pub comment: Option<ContentView>,
    pub reply: Option<ContentView>,
    pub reports_amount: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&ReportedItem> for ReportView {
    fn from(item: &ReportedItem) -> Self {
        let comment = item.comment.as_ref().map(|comment| {
            // Only the reported comment is of interest here, not its thread
            let mut view = ContentView::from(comment);
            view.replies = None;
            view
        });

        ReportView {
            id: item.first_report.id,
            reporter_id: item.first_report.reporter_id,
            comment_id: item.comment.as_ref().map(|c| c.id),
            reply_id: item.reply.as_ref().map(|r| r.id),
            comment,
            reply: item.reply.as_ref().map(ContentView::from),
            reports_amount: item.reports_amount,
            created_at: item.first_report.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Approval, PostId};

    #[test]
    fn test_comment_view_is_camel_case() {
        let approver = Uuid::new_v4();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: PostId::parse("p1").unwrap(),
            description: "hello".to_string(),
            author: Author::Manager { id: Uuid::new_v4(), role: Role::ContentCreator },
            is_banned: false,
            approval: Some(Approval::new(approver)),
            replies: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(ContentView::from(&comment)).unwrap();
        assert_eq!(json["approvedBy"], serde_json::json!(approver));
        assert_eq!(json["isApproved"], serde_json::json!(true));
        assert_eq!(json["postId"], serde_json::json!("p1"));
        assert!(json["customer"].is_null());
        assert_eq!(json["manager"]["role"], serde_json::json!("content_creator"));
        assert!(json.get("commentId").is_none());
    }
}
