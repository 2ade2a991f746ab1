//! Domain types for one reconciliation run.
//!
//! Nothing here is persisted: every value is re-derived from the two upstream
//! systems on each run.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Stable handle of a group in the docs service; the target of membership
/// mutations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocsGroupId(pub String);

impl fmt::Display for DocsGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DocsGroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocsGroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a user in the docs service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocsUserId(pub String);

impl fmt::Display for DocsUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DocsUserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocsUserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A group as the identity provider reports it. The name is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpGroup {
    pub name: String,
}

impl IdpGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A group in the docs service. `name` is mutable upstream and only used for
/// matching; `id` is what mutations address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsGroup {
    pub name: String,
    pub id: DocsGroupId,
}

impl DocsGroup {
    pub fn new(name: impl Into<String>, id: impl Into<DocsGroupId>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// One matched pair of groups. Each `idp_name` appears at most once in a
/// mapping list; a `docs_id` may appear several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMapping {
    pub idp_name: String,
    pub docs_name: String,
    pub docs_id: DocsGroupId,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user record from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpUser {
    pub username: String,
    pub name: String,
    pub email: String,
    /// Names of the groups this user belongs to.
    pub groups: Vec<String>,
}

/// A user profile from the docs service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsUser {
    pub id: DocsUserId,
    pub name: String,
    pub email: String,
}

/// The user a run reconciles, resolved once from the docs-side id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub docs_user_id: DocsUserId,
    pub docs_display_name: String,
    pub email: String,
}

impl From<DocsUser> for UserIdentity {
    fn from(user: DocsUser) -> Self {
        Self {
            docs_user_id: user.id,
            docs_display_name: user.name,
            email: user.email,
        }
    }
}

// ---------------------------------------------------------------------------
// Membership and actions
// ---------------------------------------------------------------------------

/// Where the user is a member, expressed as docs group ids on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSet {
    /// Groups the identity provider says the user belongs to.
    pub idp_side: BTreeSet<DocsGroupId>,
    /// Groups the docs service actually lists the user in.
    pub docs_side: BTreeSet<DocsGroupId>,
}

/// A single membership mutation against the docs service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Action {
    Add {
        group_id: DocsGroupId,
        user_id: DocsUserId,
    },
    Remove {
        group_id: DocsGroupId,
        user_id: DocsUserId,
    },
}

impl Action {
    pub fn group_id(&self) -> &DocsGroupId {
        match self {
            Action::Add { group_id, .. } | Action::Remove { group_id, .. } => group_id,
        }
    }

    pub fn user_id(&self) -> &DocsUserId {
        match self {
            Action::Add { user_id, .. } | Action::Remove { user_id, .. } => user_id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Remove { .. } => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} in {}", self.verb(), self.user_id(), self.group_id())
    }
}
