// Domain model - roles, discussion entities and moderation records

pub mod discussion;
pub mod role;

pub use discussion::{
    validate_description, Approval, Author, Comment, CommentsAndReplies, ContentKind, ContentRef,
    Moderated, ModerationState, NewComment, NewReply, Post, PostId, Reply, Report, ReportedItem,
};
pub use role::{author_slot_for_comment, author_slot_for_reply, AuthorSlot, Role};
