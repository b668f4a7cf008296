// Privacy - visibility, ownership and role gates for discussion content
// Pure predicates; the service loads candidates and filters with these

pub mod ownership;
pub mod route_access;
pub mod visibility;

pub use ownership::{can_remove, is_owner};
pub use route_access::RouteAccess;
pub use visibility::{is_awaiting_review, is_privately_visible, is_publicly_visible, PrivateClause};
