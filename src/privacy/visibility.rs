// Visibility rules - which comments and replies each feed may show

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Author, Moderated, Role};

/// Public feed rule: never banned, and either customer content, Administrator
/// content, or approved content-creator content. Supervisor content never qualifies.
pub fn is_publicly_visible<T: Moderated + ?Sized>(item: &T) -> bool {
    if item.is_banned() {
        return false;
    }

    match item.author() {
        Author::Customer { .. } => true,
        Author::Manager { role: Role::Administrator, .. } => true,
        Author::Manager { role: Role::ContentCreator, .. } => item.is_approved(),
        Author::Manager { .. } => false,
    }
}

/// The three independent reasons an item shows up in a manager's private feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateClause {
    /// Approved content not authored by the viewer as a manager.
    OthersApproved,
    /// The viewer's own content still waiting for approval.
    OwnDraft,
    /// The viewer's own banned content.
    OwnBanned,
}

impl PrivateClause {
    /// First clause admitting `item` for `viewer_id`, in declaration order.
    pub fn matching<T: Moderated + ?Sized>(item: &T, viewer_id: Uuid) -> Option<Self> {
        let own = item.author().manager_id() == Some(viewer_id);

        if item.is_approved() && !own {
            Some(PrivateClause::OthersApproved)
        } else if !item.is_approved() && own {
            Some(PrivateClause::OwnDraft)
        } else if own && item.is_banned() {
            Some(PrivateClause::OwnBanned)
        } else {
            None
        }
    }
}

pub fn is_privately_visible<T: Moderated + ?Sized>(item: &T, viewer_id: Uuid) -> bool {
    PrivateClause::matching(item, viewer_id).is_some()
}

/// Supervisor queue: unapproved, unbanned content-creator content.
pub fn is_awaiting_review<T: Moderated + ?Sized>(item: &T) -> bool {
    !item.is_approved()
        && !item.is_banned()
        && item.author().manager_role() == Some(Role::ContentCreator)
}
