// Route gates - which roles may call each moderation operation

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::Actor;
use crate::models::Role;

/// Every externally callable operation, each with a fixed set of admitted roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAccess {
    ListNonApproved,
    ListBanned,
    ListReported,
    ListPrivate,
    ListPublic,
    Ban,
    Approve,
    Report,
    Author,
    ResetPost,
}

impl RouteAccess {
    /// Roles admitted by this gate. `None` means the route needs no token at all.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            RouteAccess::ListNonApproved | RouteAccess::Ban => Some(&[Role::Supervisor]),
            RouteAccess::ListBanned | RouteAccess::ListReported | RouteAccess::ResetPost => {
                Some(&[Role::Administrator])
            }
            RouteAccess::ListPrivate => Some(&[Role::ContentCreator]),
            RouteAccess::Approve => Some(&[Role::Administrator, Role::Supervisor]),
            RouteAccess::Report => Some(&[Role::Student]),
            RouteAccess::Author => Some(&[Role::Administrator, Role::Student, Role::ContentCreator]),
            RouteAccess::ListPublic => None,
        }
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed_roles()
            .map_or(true, |roles| roles.contains(&role))
    }

    pub fn check(&self, actor: &Actor) -> AppResult<()> {
        if self.admits(actor.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} may not perform this action",
                actor.role
            )))
        }
    }
}
