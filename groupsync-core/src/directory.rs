//! Collaborator traits for the two upstream systems.
//!
//! Every call is blocking from the caller's point of view. Listing calls are
//! paginated: pass `None` for the first page, then the previous page's
//! [`Page::next`] until it comes back `None`.

use crate::error::UpstreamError;
use crate::types::{DocsGroup, DocsGroupId, DocsUser, DocsUserId, IdpGroup, IdpUser};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token for the following page; `None` on the last page.
    pub next: Option<u64>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Read access to the identity provider.
pub trait IdpDirectory: Send + Sync {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<IdpGroup>, UpstreamError>;

    /// Users whose email equals `email` exactly.
    fn users_by_email(&self, email: &str) -> Result<Vec<IdpUser>, UpstreamError>;

    fn users_page(&self, cursor: Option<u64>) -> Result<Page<IdpUser>, UpstreamError>;
}

/// Read and membership-write access to the docs service.
pub trait DocsDirectory: Send + Sync {
    fn groups_page(&self, cursor: Option<u64>) -> Result<Page<DocsGroup>, UpstreamError>;

    fn user_info(&self, id: &DocsUserId) -> Result<DocsUser, UpstreamError>;

    /// Ids of the members of `group` whose name matches `query`.
    fn group_members_page(
        &self,
        group: &DocsGroupId,
        query: &str,
        cursor: Option<u64>,
    ) -> Result<Page<DocsUserId>, UpstreamError>;

    /// Adding a user that is already a member must succeed.
    fn add_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError>;

    /// Removing a user that is not a member must succeed.
    fn remove_user(&self, group: &DocsGroupId, user: &DocsUserId) -> Result<(), UpstreamError>;

    fn create_group(&self, name: &str) -> Result<DocsGroup, UpstreamError>;
}
