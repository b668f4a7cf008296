use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// Authenticated caller: who they are and what role they act under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Actor { id, role }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// Request-scoped viewer, created by the middleware once the access token checks out.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub actor: Actor,
    pub request_id: String,
}

impl ViewerContext {
    pub fn new(actor: Actor, request_id: String) -> Self {
        ViewerContext { actor, request_id }
    }

    pub fn authenticated(actor: Actor) -> Self {
        let request_id = format!("req-{}", Uuid::new_v4());
        ViewerContext { actor, request_id }
    }
}
