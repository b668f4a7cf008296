// Actor roles - closed set of platform roles and the author slot each one writes to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Role carried by every authenticated actor.
///
/// Access tokens issued by the legacy platform carry the Portuguese role
/// labels, so those are accepted as aliases on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "Aluno")]
    Student,
    #[serde(alias = "Administrador")]
    Administrator,
    #[serde(alias = "Supervisor")]
    Supervisor,
    #[serde(alias = "Criador de conteúdo")]
    ContentCreator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Administrator => "administrator",
            Role::Supervisor => "supervisor",
            Role::ContentCreator => "content_creator",
        }
    }

    /// Staff roles own content through the manager author field.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Student)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" | "Aluno" => Ok(Role::Student),
            "administrator" | "Administrador" => Ok(Role::Administrator),
            "supervisor" | "Supervisor" => Ok(Role::Supervisor),
            "content_creator" | "Criador de conteúdo" => Ok(Role::ContentCreator),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Which of the two mutually exclusive author columns new content is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorSlot {
    Customer,
    Manager,
}

/// Author slot for a top-level comment. Only Administrators and content
/// creators author comments as managers; Supervisors are moderation-only here.
pub fn author_slot_for_comment(role: Role) -> AuthorSlot {
    match role {
        Role::Administrator | Role::ContentCreator => AuthorSlot::Manager,
        Role::Student | Role::Supervisor => AuthorSlot::Customer,
    }
}

/// Author slot for a reply. Every staff role, Supervisor included, replies as a manager.
pub fn author_slot_for_reply(role: Role) -> AuthorSlot {
    if role.is_staff() {
        AuthorSlot::Manager
    } else {
        AuthorSlot::Customer
    }
}
