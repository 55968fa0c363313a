//! Authorization rules for blog mutations.

use uuid::Uuid;

use crate::domain::{Actor, Blog};
use crate::error::DomainError;

/// A mutation an actor is attempting on a blog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogAction {
    Update,
    Delete,
    Publish,
}

impl BlogAction {
    fn verb(&self) -> &'static str {
        match self {
            BlogAction::Update => "update",
            BlogAction::Delete => "delete",
            BlogAction::Publish => "publish",
        }
    }
}

/// Unwrap a lookup, turning a miss into `NotFound`.
pub fn require_blog(blog: Option<Blog>, id: Uuid) -> Result<Blog, DomainError> {
    blog.ok_or_else(|| DomainError::blog_not_found(id))
}

/// Only the author may mutate a blog.
pub fn authorize(actor: &Actor, blog: &Blog, action: BlogAction) -> Result<(), DomainError> {
    if blog.is_authored_by(actor.user_id) {
        return Ok(());
    }
    tracing::warn!(
        blog_id = %blog.id,
        actor = %actor.user_id,
        action = action.verb(),
        "Rejected mutation by non-author"
    );
    Err(DomainError::Forbidden(format!(
        "You are not authorized to {} this blog.",
        action.verb()
    )))
}

/// Authorship is checked before state: a non-author gets `Forbidden` even
/// when the post is already published.
pub fn authorize_publish(actor: &Actor, blog: &Blog) -> Result<(), DomainError> {
    authorize(actor, blog, BlogAction::Publish)?;
    if blog.is_published() {
        return Err(DomainError::Conflict("Blog already published".to_string()));
    }
    Ok(())
}
