// Ownership checks for edits and removals

use crate::infrastructure::viewer::Actor;
use crate::models::{Moderated, Role};

/// Students own content through the customer author field, every other role
/// through the manager field.
pub fn is_owner<T: Moderated + ?Sized>(item: &T, actor: &Actor) -> bool {
    let author = item.author();
    match actor.role {
        Role::Student => author.customer_id() == Some(actor.id),
        _ => author.manager_id() == Some(actor.id),
    }
}

/// Authors may remove their own content; Administrators may remove anything.
pub fn can_remove<T: Moderated + ?Sized>(item: &T, actor: &Actor) -> bool {
    actor.is_administrator() || is_owner(item, actor)
}
