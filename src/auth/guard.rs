//! Authorization decisions. Callers pass the actor resolved from the token
//! and the owner/target as currently persisted.

use tracing::warn;

use crate::{db::User, error::AppError};

/// Admins may modify anything; everyone else only what they own.
pub fn can_modify(actor: &User, resource_owner_id: i64) -> bool {
    actor.is_admin() || actor.id == resource_owner_id
}

pub fn can_delete_user(actor: &User, target: &User) -> bool {
    actor.is_admin() || actor.id == target.id
}

pub fn authorize_modify(actor: &User, resource_owner_id: i64) -> Result<(), AppError> {
    if can_modify(actor, resource_owner_id) {
        return Ok(());
    }
    warn!(actor_id = actor.id, owner_id = resource_owner_id, "modification denied");
    Err(AppError::Forbidden)
}

pub fn authorize_delete_user(actor: &User, target: &User) -> Result<(), AppError> {
    if can_delete_user(actor, target) {
        return Ok(());
    }
    warn!(actor_id = actor.id, target_id = target.id, "user deletion denied");
    Err(AppError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            name: format!("user{id}"),
            password_hash: String::new(),
            role,
        }
    }

    #[test]
    fn admin_may_modify_anything() {
        let admin = user(1, Role::Admin);
        for owner in [1, 2, 42, -7] {
            assert!(can_modify(&admin, owner));
        }
        assert!(can_delete_user(&admin, &user(2, Role::User)));
        assert!(can_delete_user(&admin, &user(3, Role::Admin)));
    }

    #[test]
    fn regular_user_is_limited_to_own_resources() {
        let alice = user(1, Role::User);
        assert!(can_modify(&alice, 1));
        assert!(!can_modify(&alice, 2));
        assert!(can_delete_user(&alice, &alice));
        assert!(!can_delete_user(&alice, &user(2, Role::User)));
        assert!(!can_delete_user(&alice, &user(3, Role::Admin)));
    }

    #[test]
    fn denials_surface_as_forbidden() {
        let alice = user(1, Role::User);
        assert!(authorize_modify(&alice, 1).is_ok());
        assert!(matches!(authorize_modify(&alice, 2), Err(AppError::Forbidden)));
        assert!(matches!(
            authorize_delete_user(&alice, &user(2, Role::User)),
            Err(AppError::Forbidden)
        ));
    }
}
