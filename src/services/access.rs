//! Access Control Gate: role allow-lists and ownership checks for mutations.

use uuid::Uuid;

use crate::database::models::User;
use crate::error::ApiError;
use crate::types::{Operation, ResourceKind, Role};

pub const BOOTCAMP_WRITERS: &[Role] = &[Role::Publisher, Role::Admin];
pub const COURSE_WRITERS: &[Role] = &[Role::Publisher, Role::Admin];
pub const REVIEW_WRITERS: &[Role] = &[Role::User, Role::Admin];

/// Rejects callers whose role is not in the route's allow-list.
pub fn authorize(actor: &User, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        tracing::warn!("User {} with role {} denied", actor.id, actor.role);
        Err(ApiError::forbidden(format!(
            "{} role is not authorized to access this route",
            actor.role
        )))
    }
}

/// Only the owning user or an admin may mutate a resource.
pub fn ensure_owner(
    actor: &User,
    owner: Uuid,
    kind: ResourceKind,
    resource_id: Uuid,
    operation: Operation,
) -> Result<(), ApiError> {
    if actor.role == Role::Admin || actor.id == owner {
        return Ok(());
    }
    tracing::warn!("User {} attempted to {} {} {}", actor.id, operation, kind, resource_id);
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {} {} {}",
        actor.id, operation, kind, resource_id
    )))
}
